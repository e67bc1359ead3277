// src/models/side_channel.rs
//
// Formato do JSON gravado em `clients.side_channel`: os campos de cada
// variante que não têm coluna própria.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::client::{clean, Address, Variant};

const VARIANT: &str = "variant";
const LEGAL_NAME: &str = "legalName";
const FISCAL_ADDRESS: &str = "fiscalAddress";
const COMMERCIAL_ADDRESS: &str = "commercialAddressOverride";
const GIVEN_NAME: &str = "givenName";
const SURNAME: &str = "surname";

// Chaves dos registros gravados pela versão antiga do formulário
const LEGACY_VARIANT: &str = "tipoCliente";
const LEGACY_LEGAL_NAME: &str = "razonSocial";
const LEGACY_SURNAME: &str = "apellidos";
const LEGACY_FISCAL_KEYS: [&str; 5] = [
    "direccionFiscal",
    "poblacionFiscal",
    "codigoPostalFiscal",
    "provinciaFiscal",
    "paisFiscal",
];
const LEGACY_COMMERCIAL_KEYS: [&str; 5] = [
    "direccionComercial",
    "poblacionComercial",
    "codigoPostalComercial",
    "provinciaComercial",
    "paisComercial",
];

/// O side channel não é um objeto JSON válido.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("side channel malformado: {reason}")]
pub struct MalformedSideChannel {
    pub reason: String,
}

/// Conteúdo decodificado do side channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideChannel {
    pub variant: Option<Variant>,
    pub legal_name: Option<String>,
    pub fiscal_address: Option<Address>,
    // Só existe quando difere do endereço fiscal
    pub commercial_address: Option<Address>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    // Chaves desconhecidas, preservadas como vieram
    pub extra: Map<String, Value>,
}

impl SideChannel {
    pub fn tagged(variant: Variant) -> Self {
        Self {
            variant: Some(variant),
            ..Default::default()
        }
    }

    pub fn parse(raw: &str) -> Result<Self, MalformedSideChannel> {
        let value: Value = serde_json::from_str(raw).map_err(|e| MalformedSideChannel {
            reason: e.to_string(),
        })?;
        let Value::Object(mut map) = value else {
            return Err(MalformedSideChannel {
                reason: "não é um objeto JSON".to_string(),
            });
        };

        // A chave de variante é sempre consumida, mesmo com valor desconhecido
        let tag = map.remove(VARIANT);
        let legacy_tag = map.remove(LEGACY_VARIANT);
        let variant = tag
            .as_ref()
            .and_then(Value::as_str)
            .and_then(Variant::from_tag)
            .or_else(|| legacy_tag.as_ref().and_then(Value::as_str).and_then(Variant::from_tag));

        let legal_name = take_text(&mut map, LEGAL_NAME).or_else(|| take_text(&mut map, LEGACY_LEGAL_NAME));
        let fiscal_address = take_address(&mut map, FISCAL_ADDRESS)
            .or_else(|| take_legacy_address(&mut map, &LEGACY_FISCAL_KEYS));
        let commercial_address = take_address(&mut map, COMMERCIAL_ADDRESS)
            .or_else(|| take_legacy_address(&mut map, &LEGACY_COMMERCIAL_KEYS));
        let given_name = take_text(&mut map, GIVEN_NAME);
        let surname = take_text(&mut map, SURNAME).or_else(|| take_text(&mut map, LEGACY_SURNAME));

        Ok(Self {
            variant,
            legal_name,
            fiscal_address,
            commercial_address,
            given_name,
            surname,
            extra: map,
        })
    }

    /// Serializa com as chaves em ordem estável: a mesma entrada gera sempre os mesmos bytes.
    pub fn encode(&self) -> String {
        // serde_json::Map é um BTreeMap (sem "preserve_order"), então as chaves saem ordenadas
        let mut map = self.extra.clone();
        if let Some(variant) = self.variant {
            map.insert(VARIANT.into(), Value::from(variant.as_str()));
        }
        if let Some(legal_name) = &self.legal_name {
            map.insert(LEGAL_NAME.into(), Value::from(legal_name.as_str()));
        }
        if let Some(address) = &self.fiscal_address {
            map.insert(FISCAL_ADDRESS.into(), address_to_json(address));
        }
        if let Some(address) = &self.commercial_address {
            map.insert(COMMERCIAL_ADDRESS.into(), address_to_json(address));
        }
        if let Some(given_name) = &self.given_name {
            map.insert(GIVEN_NAME.into(), Value::from(given_name.as_str()));
        }
        if let Some(surname) = &self.surname {
            map.insert(SURNAME.into(), Value::from(surname.as_str()));
        }
        Value::Object(map).to_string()
    }

    pub fn has_company_fields(&self) -> bool {
        self.legal_name.is_some() || self.fiscal_address.is_some() || self.commercial_address.is_some()
    }

    pub fn has_individual_fields(&self) -> bool {
        self.surname.is_some() || self.given_name.is_some()
    }
}

/// Política explícita de leitura: um side channel corrompido nunca vira erro,
/// o registro apenas fica sem os campos da variante.
#[derive(Debug, Clone, PartialEq)]
pub enum SideChannelState {
    Absent,
    Parsed(SideChannel),
    Malformed(MalformedSideChannel),
}

impl SideChannelState {
    pub fn read(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => SideChannelState::Absent,
            Some(raw) => match SideChannel::parse(raw) {
                Ok(side) => SideChannelState::Parsed(side),
                Err(err) => SideChannelState::Malformed(err),
            },
        }
    }

    pub fn parsed(&self) -> Option<&SideChannel> {
        match self {
            SideChannelState::Parsed(side) => Some(side),
            _ => None,
        }
    }

    pub fn into_parsed(self) -> Option<SideChannel> {
        match self {
            SideChannelState::Parsed(side) => Some(side),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, SideChannelState::Malformed(_))
    }

    pub fn variant_tag(&self) -> Option<Variant> {
        self.parsed().and_then(|side| side.variant)
    }
}

fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    let text = clean(map.get(key)?.as_str())?;
    map.remove(key);
    Some(text)
}

fn take_address(map: &mut Map<String, Value>, key: &str) -> Option<Address> {
    let address: Address = serde_json::from_value(map.get(key)?.clone()).ok()?;
    map.remove(key);
    address.normalized()
}

fn take_legacy_address(map: &mut Map<String, Value>, keys: &[&str; 5]) -> Option<Address> {
    let mut parts = keys.iter().map(|key| {
        let part = map.get(*key).and_then(Value::as_str).map(str::to_string);
        map.remove(*key);
        part
    });
    Address {
        street: parts.next().flatten(),
        city: parts.next().flatten(),
        postal_code: parts.next().flatten(),
        province: parts.next().flatten(),
        country: parts.next().flatten(),
    }
    .normalized()
}

fn address_to_json(address: &Address) -> Value {
    let mut map = Map::new();
    let parts = [
        ("street", &address.street),
        ("city", &address.city),
        ("postalCode", &address.postal_code),
        ("province", &address.province),
        ("country", &address.country),
    ];
    for (key, part) in parts {
        if let Some(part) = part {
            map.insert(key.into(), Value::from(part.as_str()));
        }
    }
    Value::Object(map)
}
