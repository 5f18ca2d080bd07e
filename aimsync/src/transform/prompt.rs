use crate::mapping::{FieldMapping, MappedFields};
use crate::record::SourceRecord;
use crate::Result;

pub const TRANSFORM_SYSTEM_PROMPT: &str = "You are a retail product copy expert who transforms \
inventory records from a music retail point-of-sale system into e-commerce product listings. \
You write accurate, concise product copy, never invent specifications that are not implied by \
the record, and always answer with a single JSON object.";

/// User prompt for one record: the raw record, the fields already resolved by
/// the field mapping, and the rules for the fields left to the generator.
pub fn build_transform_prompt(
    record: &SourceRecord,
    mapped: &MappedFields,
    mapping: &FieldMapping,
) -> Result<String> {
    let rules = if mapping.generation_rules.is_empty() {
        "- body_html: a short HTML description (one or two <p> paragraphs)\n\
         - tags: comma separated tags covering category, subcategory and brand"
            .to_string()
    } else {
        mapping
            .generation_rules
            .iter()
            .map(|(field, rule)| format!("- {}: {}", field, rule))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!(
        "Transform this inventory record into a product listing.\n\n\
Inventory record:\n{record}\n\n\
Already mapped fields (use these values as given):\n{mapped}\n\n\
Generation rules:\n{rules}\n\n\
Respond with a JSON object of this shape:\n\
{{\"product\": {{\"title\": string, \"body_html\": string, \"vendor\": string, \"product_type\": string, \
\"tags\": string, \"published\": false, \"variants\": [{{\"price\": string, \"sku\": string, \
\"inventory_quantity\": number, \"barcode\": string}}], \"images\": []}}}}",
        record = serde_json::to_string_pretty(&record.to_json())?,
        mapped = serde_json::to_string_pretty(mapped)?,
        rules = rules,
    ))
}
