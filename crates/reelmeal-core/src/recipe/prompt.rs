use serde_json::{Value, json};

use super::GenerationInput;

pub(crate) const SYSTEM_PROMPT: &str = "You are an expert chef assistant. \
Review the following recipe transcript and refine it for clarity, conciseness, and accuracy.\n\
Ensure ingredients and instructions are well-formatted and easy to follow.\n\
Correct any obvious errors or omissions.\n\
Output must be valid JSON-LD Schema.org Recipe format.\n\
You MUST always populate the image field using the Thumbnail URL provided in the Metadata section. \
Never omit the image field if a thumbnail is provided.\n\
The keywords field should not be modified, leave it as it comes. If keywords are not present do not include them. \
Only add tags that are relevant to the recipe.";

const FIXED_INSTRUCTIONS: &str = "Use the thumbnail for the image field and the post URL for the url field.\n\
Extract ingredients and instructions clearly.\n\
Output must be valid JSON-LD Schema.org Recipe format.";

/// Build the text part of the user message.
pub(crate) fn build_user_prompt(input: &GenerationInput<'_>) -> String {
    let mut prompt = format!(
        "<Metadata>\n\
         Post URL: {}\n\
         Description: {}\n\
         Thumbnail: {}\n\
         </Metadata>\n\n\
         <Transcription>\n\
         {}\n\
         </Transcription>\n\n",
        input.post_url,
        input.description,
        input.thumbnail.unwrap_or_default(),
        input.transcript,
    );

    let tags: Vec<&str> = input
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        prompt.push_str(&format!("<keywords>{}</keywords>\n\n", tags.join(", ")));
    }

    prompt.push_str(FIXED_INSTRUCTIONS);

    // Single characters are almost always stray input, not instructions
    let extra = input.extra_prompt.trim();
    if extra.chars().count() > 1 {
        prompt.push_str("\nAlso the user requests that:\n");
        prompt.push_str(extra);
    }

    prompt
}

/// JSON schema for the structured-output response format.
///
/// Strict mode requires every property to be listed as required, so the
/// optional ones are nullable instead.
pub(crate) fn recipe_json_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "name", "image", "url", "description",
            "recipeIngredient", "recipeInstructions", "keywords"
        ],
        "properties": {
            "name": { "type": "string" },
            "image": { "type": ["string", "null"] },
            "url": { "type": ["string", "null"] },
            "description": { "type": "string" },
            "recipeIngredient": {
                "type": "array",
                "items": { "type": "string" }
            },
            "recipeInstructions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["text"],
                    "properties": { "text": { "type": "string" } }
                }
            },
            "keywords": {
                "type": ["array", "null"],
                "items": { "type": "string" }
            }
        }
    })
}
