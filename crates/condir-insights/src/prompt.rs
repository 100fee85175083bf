//! Prompt construction for contractor sales notes.

use std::fmt::Write as _;

pub const SYSTEM_PROMPT: &str =
    "You are a B2B sales intelligence assistant specializing in the roofing industry.";

/// Everything the generator is told about one contractor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractorContext {
    pub name: String,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub certifications: Vec<String>,
    pub services: Vec<String>,
    pub reviews_count: Option<i32>,
}

impl ContractorContext {
    /// The labelled fact sheet embedded in the user prompt.
    #[must_use]
    pub fn context_block(&self) -> String {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        let list_or_none = |v: &[String]| {
            if v.is_empty() {
                "None".to_string()
            } else {
                v.join(", ")
            }
        };

        let mut block = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(block, "Contractor Name: {}", self.name);
        let _ = writeln!(
            block,
            "Rating: {}/5.0",
            self.rating.map_or_else(|| "N/A".to_string(), |r| r.to_string())
        );
        let _ = writeln!(block, "Address: {}", or_na(&self.address));
        let _ = writeln!(block, "Phone: {}", or_na(&self.phone));
        let _ = writeln!(block, "Website: {}", or_na(&self.website));
        let _ = writeln!(
            block,
            "Description: {}",
            self.description.as_deref().unwrap_or("No description")
        );
        let _ = writeln!(block, "Certifications: {}", list_or_none(&self.certifications));
        let _ = writeln!(block, "Services: {}", list_or_none(&self.services));
        let _ = write!(
            block,
            "Reviews Count: {}",
            self.reviews_count.map_or_else(|| "N/A".to_string(), |n| n.to_string())
        );
        block
    }

    #[must_use]
    pub fn user_prompt(&self) -> String {
        format!(
            "You are a sales intelligence assistant for roofing distributors.\n\n\
             Based on this contractor information, generate a concise sales insight (2-3 sentences):\n\
             1. Key strengths or selling points\n\
             2. Potential business opportunities for a roofing materials distributor\n\
             3. Suggested talking points for sales engagement\n\n\
             Contractor Information:\n{}\n\n\
             Generate a professional, actionable insight for the sales team:",
            self.context_block()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_block_fills_placeholders() {
        let context = ContractorContext {
            name: "Summit Roofing".to_string(),
            ..ContractorContext::default()
        };
        let block = context.context_block();
        assert!(block.contains("Contractor Name: Summit Roofing"));
        assert!(block.contains("Rating: N/A/5.0"));
        assert!(block.contains("Description: No description"));
        assert!(block.contains("Certifications: None"));
        assert!(block.ends_with("Reviews Count: N/A"));
    }

    #[test]
    fn context_block_lists_values() {
        let context = ContractorContext {
            name: "Summit Roofing".to_string(),
            rating: Some(4.8),
            certifications: vec!["Master Elite".to_string(), "President's Club".to_string()],
            reviews_count: Some(87),
            ..ContractorContext::default()
        };
        let block = context.context_block();
        assert!(block.contains("Rating: 4.8/5.0"));
        assert!(block.contains("Certifications: Master Elite, President's Club"));
        assert!(block.contains("Reviews Count: 87"));
    }

    #[test]
    fn user_prompt_embeds_context() {
        let context = ContractorContext {
            name: "Ridge Co".to_string(),
            ..ContractorContext::default()
        };
        let prompt = context.user_prompt();
        assert!(prompt.contains("Contractor Information:\nContractor Name: Ridge Co"));
        assert!(prompt.ends_with("actionable insight for the sales team:"));
    }
}
