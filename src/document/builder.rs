//! Shapes log events into BSON documents.

use std::fmt;
use std::sync::Arc;

use mongodb::bson::{self, Bson, Document};

use crate::document::event::{LogEvent, ProcessContext};
use crate::document::layout::Layout;

/// Field every fixed-shape document stores the event time under.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One configured document field.
#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub layout: Arc<dyn Layout>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, layout: impl Layout + 'static) -> Self {
        Self {
            name: name.into(),
            layout: Arc::new(layout),
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec").field("name", &self.name).finish()
    }
}

/// Builds one document per event, from a field list or the fixed shape.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    fields: Vec<FieldSpec>,
    context: ProcessContext,
}

impl DocumentBuilder {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            context: ProcessContext::current().clone(),
        }
    }

    /// Replace the detected host/process facts.
    pub fn with_context(mut self, context: ProcessContext) -> Self {
        self.context = context;
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn build(&self, event: &LogEvent) -> Document {
        build_document(event, &self.fields, &self.context)
    }
}

/// Shape `event` into a document.
///
/// With no fields configured the fixed shape is produced. Otherwise each
/// field is formatted in order; a later field with a repeated name replaces
/// the earlier value.
pub fn build_document(event: &LogEvent, fields: &[FieldSpec], context: &ProcessContext) -> Document {
    if fields.is_empty() {
        return fixed_document(event, context);
    }

    let mut doc = Document::new();
    for field in fields {
        let value = field.layout.format_with(event, context);
        doc.insert(field.name.clone(), value.to_bson());
    }
    doc
}

/// The fixed document shape.
///
/// Existing stored data is queried by these field names; they must not change.
pub fn fixed_document(event: &LogEvent, context: &ProcessContext) -> Document {
    let mut doc = Document::new();
    doc.insert(
        TIMESTAMP_FIELD,
        Bson::DateTime(bson::DateTime::from_millis(event.timestamp.timestamp_millis())),
    );
    doc.insert("level", event.level.as_str());
    doc.insert("thread", event.thread.as_str());
    doc.insert(
        "userName",
        event
            .user_name
            .as_deref()
            .or(context.user_name.as_deref())
            .map_or(Bson::Null, |u| Bson::String(u.to_string())),
    );
    doc.insert("message", event.message.as_str());
    doc.insert("loggerName", event.logger_name.as_str());
    doc.insert("domain", context.domain.as_str());
    doc.insert("machineName", context.machine_name.as_str());

    if let Some(location) = &event.location {
        if let Bson::Document(loc) = location.to_value().to_bson() {
            for (key, value) in loc {
                doc.insert(key, value);
            }
        }
    }

    if let Some(exception) = &event.exception {
        doc.insert("exception", exception.to_value().to_bson());
    }

    if !event.properties.is_empty() {
        doc.insert("properties", event.properties_value().to_bson());
    }

    doc
}
