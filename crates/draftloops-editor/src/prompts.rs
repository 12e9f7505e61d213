/// Prompt templates for the editor role
pub struct EditorPrompts;

impl EditorPrompts {
    /// System message that frames the editor's job.
    pub fn system_prompt() -> String {
        r#"You are an expert editor focused on improving document clarity, coherence, and structure. Analyze the provided content and make improvements while maintaining accuracy and key information. Focus on:
1. Clear narrative flow
2. Logical structure
3. Consistent style
4. Proper transitions between topics
5. Elimination of redundancy"#
            .to_string()
    }

    /// Build the revision prompt from the current document state.
    pub fn build_revision_prompt(content: &str, topics: &[String], version: u32) -> String {
        format!(
            r#"Please review and improve the following document:

Topics: {topics}
Version: {version}

Content:
{content}

Provide the improved version maintaining all key information but enhancing readability and structure."#,
            topics = topics.join(", "),
            version = version,
            content = content,
        )
    }
}
