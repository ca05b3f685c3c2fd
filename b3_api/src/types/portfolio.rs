use serde::{Deserialize, Deserializer, Serialize};

/// One page of the `GetPortfolioDay` response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageEnvelope {
    #[serde(default)]
    pub page: PageInfo,
    #[serde(default)]
    pub header: Option<PortfolioHeader>,
    pub results: Vec<Constituent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub total_records: Option<i64>,
    pub total_pages: Option<i64>,
}

/// Portfolio-wide metadata. Numeric values keep the upstream locale
/// formatting (`95.029.281.398`, `16.683.713,71215846`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioHeader {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub part: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub part_acum: Option<String>,
    #[serde(default)]
    pub text_reductor: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub reductor: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub theorical_qty: Option<String>,
}

/// One index constituent as sent on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constituent {
    #[serde(default)]
    pub segment: Option<String>,
    pub cod: String,
    pub asset: String,
    #[serde(rename = "type")]
    pub share_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub part: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub part_acum: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub theorical_qty: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Str(s) => s,
            // Plain JSON numbers use `.` as decimal separator; re-express them
            // in the upstream locale so a single parser handles both.
            StringOrNumber::Num(n) => n.to_string().replace('.', ","),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_wire_values_become_locale_strings() {
        let json = r#"{"segment":null,"cod":"ALOS3","asset":"ALLOS","type":"ON NM","part":0.49,"partAcum":null,"theoricalQty":476976044}"#;
        let c: Constituent = serde_json::from_str(json).unwrap();
        assert_eq!(c.part, "0,49");
        assert_eq!(c.theorical_qty, "476976044");
        assert_eq!(c.part_acum, None);
    }

    #[test]
    fn missing_page_and_header_default() {
        let env: PageEnvelope = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert_eq!(env.page, PageInfo::default());
        assert!(env.header.is_none());
    }
}
