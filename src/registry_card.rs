// 🗂️ Registry Card - view-model for a navigable summary card
//
// A card names a registry (clients, purchases, ...), links to its route and
// lists its most recent entries. Cards are built per render and never stored.
//
// Identifiers are opaque: producers hand us numbers or text and we only ever
// compare and display them. Colors are free-form tokens; a renderer that
// only understands a fixed palette resolves them through `Palette`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("required field `{0}` is missing or blank")]
    MissingField(&'static str),
}

// ============================================================================
// IDENTIFIERS, VALUES, COLORS
// ============================================================================

/// Opaque identifier supplied by whoever builds the card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryId::Number(n) => write!(f, "{}", n),
            RegistryId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RegistryId {
    fn from(value: i64) -> Self {
        RegistryId::Number(value)
    }
}

impl From<i32> for RegistryId {
    fn from(value: i32) -> Self {
        RegistryId::Number(value.into())
    }
}

impl From<u32> for RegistryId {
    fn from(value: u32) -> Self {
        RegistryId::Number(value.into())
    }
}

impl From<&str> for RegistryId {
    fn from(value: &str) -> Self {
        RegistryId::Text(value.to_string())
    }
}

impl From<String> for RegistryId {
    fn from(value: String) -> Self {
        RegistryId::Text(value)
    }
}

/// Value shown on an entry line: a raw number or pre-formatted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Number(n) => write!(f, "{}", n),
            DisplayValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for DisplayValue {
    fn from(value: f64) -> Self {
        DisplayValue::Number(value)
    }
}

impl From<i64> for DisplayValue {
    fn from(value: i64) -> Self {
        DisplayValue::Number(value as f64)
    }
}

impl From<&str> for DisplayValue {
    fn from(value: &str) -> Self {
        DisplayValue::Text(value.to_string())
    }
}

impl From<String> for DisplayValue {
    fn from(value: String) -> Self {
        DisplayValue::Text(value)
    }
}

/// Free-form color token ("green", "#1e88e5", "primary", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(String);

impl ColorToken {
    pub fn new(token: impl Into<String>) -> Self {
        ColorToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColorToken {
    fn from(value: &str) -> Self {
        ColorToken::new(value)
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A renderer's closed set of colors
///
/// Renderers that can only draw a fixed palette implement this and decide
/// which tokens they accept. The card itself never restricts tokens.
pub trait Palette {
    type Color;

    fn resolve(&self, token: &ColorToken) -> Option<Self::Color>;
}

fn require(value: &str, field: &'static str) -> Result<(), CardError> {
    if value.trim().is_empty() {
        Err(CardError::MissingField(field))
    } else {
        Ok(())
    }
}

// ============================================================================
// REGISTRY ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEntry")]
pub struct RegistryEntry {
    pub id: RegistryId,
    pub name: String,
    pub value: DisplayValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_color: Option<ColorToken>,
}

impl RegistryEntry {
    pub fn new(
        id: impl Into<RegistryId>,
        name: impl Into<String>,
        value: impl Into<DisplayValue>,
    ) -> Result<Self, CardError> {
        let name = name.into();
        require(&name, "name")?;

        Ok(RegistryEntry {
            id: id.into(),
            name,
            value: value.into(),
            value_complement: None,
            value_color: None,
        })
    }

    pub fn with_complement(mut self, complement: impl Into<String>) -> Self {
        self.value_complement = Some(complement.into());
        self
    }

    pub fn with_value_color(mut self, color: impl Into<ColorToken>) -> Self {
        self.value_color = Some(color.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    id: RegistryId,
    name: String,
    value: DisplayValue,
    #[serde(default)]
    value_complement: Option<String>,
    #[serde(default)]
    value_color: Option<ColorToken>,
}

impl TryFrom<RawEntry> for RegistryEntry {
    type Error = CardError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let mut entry = RegistryEntry::new(raw.id, raw.name, raw.value)?;
        entry.value_complement = raw.value_complement;
        entry.value_color = raw.value_color;
        Ok(entry)
    }
}

// ============================================================================
// REGISTRY CARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCard")]
pub struct RegistryCard {
    pub id: RegistryId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub route: String,
    pub action_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_color: Option<ColorToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_color: Option<ColorToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<ColorToken>,
    /// Display order, exactly as the producer pushed them
    pub recent_registries: Vec<RegistryEntry>,
}

impl RegistryCard {
    /// Create a card with its required fields; optional ones start empty
    pub fn new(
        id: impl Into<RegistryId>,
        title: impl Into<String>,
        route: impl Into<String>,
        action_label: impl Into<String>,
    ) -> Result<Self, CardError> {
        let title = title.into();
        let route = route.into();
        let action_label = action_label.into();

        require(&title, "title")?;
        require(&route, "route")?;
        require(&action_label, "actionLabel")?;

        Ok(RegistryCard {
            id: id.into(),
            title,
            subtitle: None,
            route,
            action_label,
            value_color: None,
            name_color: None,
            icon: None,
            icon_color: None,
            recent_registries: Vec::new(),
        })
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_icon_color(mut self, color: impl Into<ColorToken>) -> Self {
        self.icon_color = Some(color.into());
        self
    }

    pub fn with_value_color(mut self, color: impl Into<ColorToken>) -> Self {
        self.value_color = Some(color.into());
        self
    }

    pub fn with_name_color(mut self, color: impl Into<ColorToken>) -> Self {
        self.name_color = Some(color.into());
        self
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
        self.recent_registries.extend(entries);
        self
    }

    pub fn push_entry(&mut self, entry: RegistryEntry) {
        self.recent_registries.push(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.recent_registries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.recent_registries.is_empty()
    }

    /// Icon color through a restricting palette; `None` when unset or not in the palette
    pub fn resolve_icon_color<P: Palette>(&self, palette: &P) -> Option<P::Color> {
        self.icon_color.as_ref().and_then(|token| palette.resolve(token))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCard {
    id: RegistryId,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    route: String,
    action_label: String,
    #[serde(default)]
    value_color: Option<ColorToken>,
    #[serde(default)]
    name_color: Option<ColorToken>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    icon_color: Option<ColorToken>,
    #[serde(default)]
    recent_registries: Vec<RegistryEntry>,
}

impl TryFrom<RawCard> for RegistryCard {
    type Error = CardError;

    fn try_from(raw: RawCard) -> Result<Self, Self::Error> {
        let mut card = RegistryCard::new(raw.id, raw.title, raw.route, raw.action_label)?;
        card.subtitle = raw.subtitle;
        card.value_color = raw.value_color;
        card.name_color = raw.name_color;
        card.icon = raw.icon;
        card.icon_color = raw.icon_color;
        card.recent_registries = raw.recent_registries;
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_card() -> RegistryCard {
        RegistryCard::new("purchases", "Purchases", "/purchases", "View purchases").unwrap()
    }

    #[test]
    fn test_empty_card_is_valid() {
        let card = sample_card();
        assert!(card.is_empty());
        assert_eq!(card.subtitle, None);
        assert_eq!(card.icon_color, None);

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["recentRegistries"], json!([]));
        assert!(value.get("subtitle").is_none());
    }

    #[test]
    fn test_entries_keep_producer_order() {
        let names = ["zeta", "alpha", "mid", "alpha"];
        let card = sample_card().with_entries(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| RegistryEntry::new(i as i64, *n, 1.0).unwrap()),
        );

        let seen: Vec<&str> = card.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(seen, names);

        let round_trip: RegistryCard =
            serde_json::from_str(&serde_json::to_string(&card).unwrap()).unwrap();
        let seen: Vec<&str> = round_trip.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(seen, names);
    }

    #[test]
    fn test_id_accepts_text_and_numbers() {
        let by_text = RegistryEntry::new("abc-1", "Text id", "R$ 10,00").unwrap();
        let by_number = RegistryEntry::new(42i64, "Number id", 10.0).unwrap();
        assert_eq!(by_text.id.to_string(), "abc-1");
        assert_eq!(by_number.id.to_string(), "42");

        let card: RegistryCard = serde_json::from_value(json!({
            "id": 7,
            "title": "Clients",
            "route": "/clients",
            "actionLabel": "Open",
            "recentRegistries": [
                { "id": "x1", "name": "Ana", "value": "ana" },
                { "id": 2, "name": "Bruno", "value": 12.5 }
            ]
        }))
        .unwrap();

        assert_eq!(card.id, RegistryId::Number(7));
        assert_eq!(card.recent_registries[0].id, RegistryId::Text("x1".into()));
        assert_eq!(card.recent_registries[1].value, DisplayValue::Number(12.5));
    }

    #[test]
    fn test_missing_required_fields_fail_at_construction() {
        assert_eq!(
            RegistryCard::new(1i64, "  ", "/x", "Go").unwrap_err(),
            CardError::MissingField("title")
        );
        assert_eq!(
            RegistryCard::new(1i64, "T", "", "Go").unwrap_err(),
            CardError::MissingField("route")
        );
        assert_eq!(
            RegistryEntry::new(1i64, "", 0.0).unwrap_err(),
            CardError::MissingField("name")
        );

        let missing_route = serde_json::from_value::<RegistryCard>(json!({
            "id": 1, "title": "T", "actionLabel": "Go"
        }));
        assert!(missing_route.is_err());

        let blank_entry = serde_json::from_value::<RegistryCard>(json!({
            "id": 1, "title": "T", "route": "/t", "actionLabel": "Go",
            "recentRegistries": [{ "id": 1, "name": " ", "value": 1 }]
        }));
        assert!(blank_entry.is_err());
    }

    #[test]
    fn test_entry_value_color_serializes_camel_case() {
        let entry = RegistryEntry::new(1i64, "NF-0001", "R$ 50,00")
            .unwrap()
            .with_complement("partial")
            .with_value_color("yellow");

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["valueComplement"], "partial");
        assert_eq!(value["valueColor"], "yellow");
    }

    struct TwoColors;

    impl Palette for TwoColors {
        type Color = u8;

        fn resolve(&self, token: &ColorToken) -> Option<u8> {
            match token.as_str() {
                "red" => Some(1),
                "green" => Some(2),
                _ => None,
            }
        }
    }

    #[test]
    fn test_palette_refines_free_form_tokens() {
        let card = sample_card().with_icon_color("green");
        assert_eq!(card.resolve_icon_color(&TwoColors), Some(2));

        // Accepted by the card, rejected by the palette
        let card = sample_card().with_icon_color("teal-400");
        assert_eq!(card.icon_color, Some(ColorToken::new("teal-400")));
        assert_eq!(card.resolve_icon_color(&TwoColors), None);
    }
}
