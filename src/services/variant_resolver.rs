// src/services/variant_resolver.rs
//
// Decide se um cliente é empresa ou particular. Nunca falha: sem nenhum
// sinal, o cliente é tratado como empresa.

use crate::models::{
    client::{ClientRecord, ClientRow, Variant, VariantView},
    side_channel::SideChannelState,
};

/// De onde a variante foi tirada, na ordem de prioridade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantSource {
    Hint,
    RecordTag,
    SideChannelTag,
    CompanyFields,
    IndividualFields,
    Default,
}

/// Qualquer coisa que carregue sinais de variante: a linha gravada, a linha
/// anotada da listagem ou uma visão já expandida.
pub trait VariantSignals {
    /// Etiqueta explícita já presente no próprio objeto.
    fn variant_tag(&self) -> Option<Variant> {
        None
    }

    fn side_channel(&self) -> Option<&str>;
}

impl VariantSignals for ClientRecord {
    fn side_channel(&self) -> Option<&str> {
        self.side_channel.as_deref()
    }
}

impl VariantSignals for ClientRow {
    fn variant_tag(&self) -> Option<Variant> {
        self.variant
    }

    fn side_channel(&self) -> Option<&str> {
        self.record.side_channel.as_deref()
    }
}

impl VariantSignals for VariantView {
    fn variant_tag(&self) -> Option<Variant> {
        Some(self.variant())
    }

    fn side_channel(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub variant: Variant,
    pub source: VariantSource,
    // O side channel já lido, para quem precisar dos campos
    pub side_channel: SideChannelState,
}

pub fn resolve<R>(record: &R, hint: Option<Variant>) -> Resolution
where
    R: VariantSignals + ?Sized,
{
    let side_channel = SideChannelState::read(record.side_channel());

    let (variant, source) = if let Some(variant) = hint {
        (variant, VariantSource::Hint)
    } else if let Some(variant) = record.variant_tag() {
        (variant, VariantSource::RecordTag)
    } else if let Some(variant) = side_channel.variant_tag() {
        (variant, VariantSource::SideChannelTag)
    } else if side_channel.parsed().is_some_and(|side| side.has_company_fields()) {
        (Variant::Company, VariantSource::CompanyFields)
    } else if side_channel.parsed().is_some_and(|side| side.has_individual_fields()) {
        (Variant::Individual, VariantSource::IndividualFields)
    } else {
        (Variant::Company, VariantSource::Default)
    };

    Resolution {
        variant,
        source,
        side_channel,
    }
}
