// src/services/projection.rs
//
// Converte entre a linha gravada (colunas base + side channel) e a visão
// tipada de cada variante.
//
// expand:   ClientRecord  -> VariantView
// compress: VariantInput  -> colunas base + side channel

use serde_json::{Map, Value};

use crate::{
    models::{
        client::{
            clean, Address, ClientColumns, ClientCommon, ClientRecord, CompanyInput, CompanyView,
            CompressedClient, IndividualInput, IndividualView, SharedInput, UntaggedInput, Variant,
            VariantInput, VariantView, DEFAULT_CATEGORY,
        },
        side_channel::SideChannel,
    },
    services::variant_resolver::{resolve, Resolution},
};

// Chaves do side channel que nunca sobrescrevem a linha gravada
const PROTECTED_KEYS: [&str; 6] = [
    "id",
    "ownerUserId",
    "status",
    "createdAt",
    "deactivatedAt",
    "sortPosition",
];

// Chaves que a própria visão emite: nunca podem sair de novo por `extra`
const COMPANY_VIEW_KEYS: &[&str] = &[
    "taxId",
    "legalName",
    "fiscalAddress",
    "separateCommercialAddress",
];
const INDIVIDUAL_VIEW_KEYS: &[&str] = &["nationalId", "givenName", "surname"];

pub fn expand(record: &ClientRecord) -> VariantView {
    let Resolution {
        variant,
        side_channel,
        ..
    } = resolve(record, None);

    // Side channel ausente ou corrompido: segue só com as colunas base
    let mut side = side_channel.into_parsed().unwrap_or_default();
    let (identifier_key, view_keys) = match variant {
        Variant::Company => ("taxId", COMPANY_VIEW_KEYS),
        Variant::Individual => ("nationalId", INDIVIDUAL_VIEW_KEYS),
    };
    // Um identificador gravado no side channel vence o da coluna
    let identifier = clean(side.extra.get(identifier_key).and_then(Value::as_str))
        .or_else(|| record.legal_identifier.clone());
    side.extra.retain(|key, _| !view_keys.contains(&key.as_str()));

    let common = overlay(ClientCommon::from(record), &side.extra);

    match variant {
        Variant::Company => VariantView::Company(CompanyView {
            common,
            tax_id: identifier,
            legal_name: side.legal_name,
            fiscal_address: side.fiscal_address,
            separate_commercial_address: side.commercial_address.is_some(),
        }),
        Variant::Individual => {
            let given_name = strip_surname(&common.display_name, side.surname.as_deref());
            VariantView::Individual(IndividualView {
                common,
                national_id: identifier,
                given_name,
                surname: side.surname,
            })
        }
    }
}

pub fn compress(input: &VariantInput) -> CompressedClient {
    match input {
        VariantInput::Company(company) => compress_company(company),
        VariantInput::Individual(individual) => compress_individual(individual),
        VariantInput::Untagged(untagged) => compress_untagged(untagged),
    }
}

fn compress_company(input: &CompanyInput) -> CompressedClient {
    let fiscal = normalized(&input.fiscal_address);
    let commercial = normalized(&input.commercial_address);
    // O endereço comercial só vai para o side channel quando difere do fiscal
    let commercial_override = commercial.clone().filter(|c| fiscal.as_ref() != Some(c));

    let mut columns = shared_columns(&input.shared);
    columns.legal_identifier = clean(input.tax_id.as_deref());
    columns.commercial_address = commercial.or_else(|| fiscal.clone());

    let side = SideChannel {
        legal_name: clean(input.legal_name.as_deref()),
        fiscal_address: fiscal,
        commercial_address: commercial_override,
        ..SideChannel::tagged(Variant::Company)
    };

    CompressedClient {
        columns,
        side_channel: Some(side.encode()),
    }
}

fn compress_individual(input: &IndividualInput) -> CompressedClient {
    let surname = clean(input.surname.as_deref());
    let given_name = clean(input.given_name.as_deref()).or_else(|| {
        clean(input.shared.display_name.as_deref())
            .map(|name| strip_surname(&name, surname.as_deref()))
    });

    let mut columns = shared_columns(&input.shared);
    columns.display_name = [given_name.as_deref(), surname.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    columns.legal_identifier = clean(input.national_id.as_deref());
    columns.commercial_address = normalized(&input.address);

    let side = SideChannel {
        given_name,
        surname,
        ..SideChannel::tagged(Variant::Individual)
    };

    CompressedClient {
        columns,
        side_channel: Some(side.encode()),
    }
}

fn compress_untagged(input: &UntaggedInput) -> CompressedClient {
    let mut columns = shared_columns(&input.shared);
    columns.legal_identifier = clean(input.legal_identifier.as_deref());
    columns.commercial_address = normalized(&input.address);

    CompressedClient {
        columns,
        side_channel: None,
    }
}

fn shared_columns(shared: &SharedInput) -> ClientColumns {
    ClientColumns {
        display_name: clean(shared.display_name.as_deref()).unwrap_or_default(),
        trade_name: clean(shared.trade_name.as_deref()),
        legal_identifier: None,
        vat_id: clean(shared.vat_id.as_deref()),
        commercial_address: None,
        email: clean(shared.email.as_deref()),
        phone: clean(shared.phone.as_deref()),
        mobile: clean(shared.mobile.as_deref()),
        website: clean(shared.website.as_deref()),
        category: clean(shared.category.as_deref()).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        notes: clean(shared.notes.as_deref()),
        contact_person: clean(shared.contact_person.as_deref()),
        language: clean(shared.language.as_deref()),
        currency: clean(shared.currency.as_deref()),
        registration_date: shared.registration_date,
        birth_date: shared.birth_date,
    }
}

fn normalized(address: &Option<Address>) -> Option<Address> {
    address.as_ref().and_then(Address::normalized)
}

/// Recupera o nome próprio tirando o sobrenome do fim do nome completo.
/// Só corta em fronteira de palavra; sem sobrenome aplicável devolve o nome inteiro.
fn strip_surname(display_name: &str, surname: Option<&str>) -> String {
    let full = display_name.trim();
    let Some(surname) = surname.map(str::trim).filter(|s| !s.is_empty()) else {
        return full.to_string();
    };

    match full.strip_suffix(surname) {
        Some(rest) if rest.ends_with(char::is_whitespace) => rest.trim_end().to_string(),
        _ => full.to_string(),
    }
}

/// Aplica as chaves desconhecidas do side channel por cima dos campos comuns.
/// Uma chave cujo valor não cabe no campo é ignorada; as demais entram em `extra`.
fn overlay(common: ClientCommon, extra: &Map<String, Value>) -> ClientCommon {
    if extra.is_empty() {
        return common;
    }
    let Ok(Value::Object(mut merged)) = serde_json::to_value(&common) else {
        return common;
    };

    for (key, value) in extra {
        if PROTECTED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let previous = merged.insert(key.clone(), value.clone());
        if serde_json::from_value::<ClientCommon>(Value::Object(merged.clone())).is_err() {
            match previous {
                Some(previous) => merged.insert(key.clone(), previous),
                None => merged.remove(key),
            };
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or(common)
}
