//! Fixed prompt text sent upstream.

/// Persona and tool-usage policy for the tool-calling request.
pub const SYSTEM_INSTRUCTION: &str = "You're a helpful assistant that does all you can to help without asking questions.
You have tools.
You can use multiple tools.
Decide on what tools you will call.
Then use informUser to tell the user what you will do.
Use informUser again to tell the user when the other functions are done.
Never promise and forget calling the function.
Answer in the user's language.";

pub fn user_prompt(prompt: &str) -> String {
    format!("User request: {prompt}")
}

/// Prompt for the nested long-form text stream used by drafting tools.
pub fn expansion_prompt(text: &str) -> String {
    format!("Make a long version of this text, it should be at least 2 paragraphs:\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_prefix() {
        assert_eq!(user_prompt("send a report"), "User request: send a report");
    }

    #[test]
    fn expansion_prompt_embeds_text() {
        let p = expansion_prompt("meeting moved");
        assert!(p.starts_with("Make a long version of this text"));
        assert!(p.ends_with("\n\nmeeting moved"));
    }

    #[test]
    fn system_instruction_policies() {
        assert!(SYSTEM_INSTRUCTION.contains("informUser"));
        assert!(SYSTEM_INSTRUCTION.ends_with("Answer in the user's language."));
    }
}
