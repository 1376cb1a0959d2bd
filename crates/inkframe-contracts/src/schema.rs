use indexmap::IndexMap;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array(Box<FieldType>),
    Object(ObjectSchema),
}

impl FieldType {
    fn gemini_type(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Array(_) => "ARRAY",
            FieldType::Object(_) => "OBJECT",
        }
    }

    fn to_gemini_value(&self, description: Option<&str>) -> Value {
        let mut out = match self {
            FieldType::Object(object) => object.to_gemini_map(),
            _ => Map::new(),
        };
        out.insert(
            "type".to_string(),
            Value::String(self.gemini_type().to_string()),
        );
        if let FieldType::Array(items) = self {
            out.insert("items".to_string(), items.to_gemini_value(None));
        }
        if let Some(description) = description.filter(|value| !value.is_empty()) {
            out.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldType,
    pub required: bool,
    pub description: String,
}

/// Declared shape of a structured response: field name -> type, required-ness
/// and description, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, kind: FieldType, description: &str) -> Self {
        self.field(name, kind, true, description)
    }

    pub fn optional(self, name: &str, kind: FieldType, description: &str) -> Self {
        self.field(name, kind, false, description)
    }

    fn field(mut self, name: &str, kind: FieldType, required: bool, description: &str) -> Self {
        self.fields.insert(
            name.to_string(),
            FieldSpec {
                kind,
                required,
                description: description.to_string(),
            },
        );
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Renders the OpenAPI-subset schema accepted by `generationConfig.responseSchema`.
    pub fn to_gemini_value(&self) -> Value {
        FieldType::Object(self.clone()).to_gemini_value(None)
    }

    fn to_gemini_map(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        for (name, spec) in &self.fields {
            properties.insert(
                name.clone(),
                spec.kind.to_gemini_value(Some(&spec.description)),
            );
        }
        let mut out = Map::new();
        out.insert("properties".to_string(), Value::Object(properties));
        out.insert("required".to_string(), json!(self.required_fields()));
        out.insert(
            "propertyOrdering".to_string(),
            json!(self.fields.keys().collect::<Vec<_>>()),
        );
        out
    }
}
