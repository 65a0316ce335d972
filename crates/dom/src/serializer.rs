//! Descriptor serializer - interaction list to LLM-facing formats
//!
//! Two renderings of the same list:
//! - compact JSON (`[{"id":1,"t":"btn","l":"Save","r":"main"}, ...]`)
//! - one text line per element (`[1] btn "Save" @main`)

use crate::error::Result;
use crate::types::{ElementDescriptor, TypeCode};

/// Serializer configuration
#[derive(Debug, Clone, Default)]
pub struct SerializerConfig {
    /// Keep only these types (empty keeps everything)
    pub kinds: Vec<TypeCode>,
    /// Keep only labels containing this text, compared case-insensitively
    pub label_contains: Option<String>,
    /// Leave offscreen elements out
    pub skip_offscreen: bool,
}

/// Interaction list serializer
pub struct DomSerializer {
    config: SerializerConfig,
}

impl DomSerializer {
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    pub fn with_config(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Descriptors that pass the configured filters, in their original order
    pub fn filter<'a>(&self, descriptors: &'a [ElementDescriptor]) -> Vec<&'a ElementDescriptor> {
        let needle = self.config.label_contains.as_ref().map(|s| s.to_lowercase());
        descriptors
            .iter()
            .filter(|d| self.config.kinds.is_empty() || self.config.kinds.contains(&d.kind))
            .filter(|d| !(self.config.skip_offscreen && d.offscreen == Some(true)))
            .filter(|d| match &needle {
                Some(needle) => d.label.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .collect()
    }

    /// Compact JSON array, no whitespace
    pub fn to_json(&self, descriptors: &[ElementDescriptor]) -> Result<String> {
        Ok(serde_json::to_string(&self.filter(descriptors))?)
    }

    /// One line per element
    pub fn to_text(&self, descriptors: &[ElementDescriptor]) -> String {
        let mut output = String::with_capacity(descriptors.len() * 32);
        for descriptor in self.filter(descriptors) {
            Self::write_line(descriptor, &mut output);
            output.push('\n');
        }
        output
    }

    fn write_line(d: &ElementDescriptor, output: &mut String) {
        output.push_str(&format!(
            "[{}] {} {:?} @{}",
            d.id,
            d.kind.as_str(),
            d.label,
            d.region.as_str()
        ));
        if let Some(input_type) = &d.input_type {
            output.push_str(&format!(" type={}", input_type));
        }
        if let Some(value) = &d.value {
            output.push_str(&format!(" value={:?}", value));
        }
        match d.checked {
            Some(true) => output.push_str(" [x]"),
            Some(false) => output.push_str(" [ ]"),
            None => {}
        }
        if d.disabled == Some(true) {
            output.push_str(" disabled");
        }
        if d.offscreen == Some(true) {
            output.push_str(" offscreen");
        }
    }
}

impl Default for DomSerializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionCode;

    fn descriptor(id: u32, kind: TypeCode, label: &str) -> ElementDescriptor {
        ElementDescriptor {
            id,
            kind,
            label: label.to_string(),
            region: RegionCode::Main,
            input_type: None,
            value: None,
            checked: None,
            disabled: None,
            offscreen: None,
        }
    }

    fn sample() -> Vec<ElementDescriptor> {
        let mut email = descriptor(2, TypeCode::Input, "Email");
        email.input_type = Some("email".to_string());
        email.value = Some("a@b.c".to_string());

        let mut terms = descriptor(3, TypeCode::Checkbox, "Accept terms");
        terms.checked = Some(false);

        let mut more = descriptor(4, TypeCode::Link, "Load more");
        more.region = RegionCode::Footer;
        more.offscreen = Some(true);

        vec![descriptor(1, TypeCode::Button, "Save"), email, terms, more]
    }

    #[test]
    fn test_json_is_compact() {
        let json = DomSerializer::new().to_json(&sample()[..1]).unwrap();
        assert_eq!(json, r#"[{"id":1,"t":"btn","l":"Save","r":"main"}]"#);
    }

    #[test]
    fn test_text_lines() {
        let text = DomSerializer::new().to_text(&sample());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"[1] btn "Save" @main"#,
                r#"[2] in "Email" @main type=email value="a@b.c""#,
                r#"[3] chk "Accept terms" @main [ ]"#,
                r#"[4] link "Load more" @ftr offscreen"#,
            ]
        );
    }

    #[test]
    fn test_filters() {
        let descriptors = sample();

        let by_kind = DomSerializer::with_config(SerializerConfig {
            kinds: vec![TypeCode::Button, TypeCode::Link],
            ..Default::default()
        });
        let ids: Vec<_> = by_kind.filter(&descriptors).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 4]);

        let by_label = DomSerializer::with_config(SerializerConfig {
            label_contains: Some("TERMS".to_string()),
            ..Default::default()
        });
        let ids: Vec<_> = by_label.filter(&descriptors).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3]);

        let onscreen = DomSerializer::with_config(SerializerConfig {
            skip_offscreen: true,
            ..Default::default()
        });
        assert_eq!(onscreen.filter(&descriptors).len(), 3);
    }
}
