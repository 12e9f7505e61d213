/// Prompt templates for the judge role
pub struct JudgePrompts;

impl JudgePrompts {
    /// System message that frames the judge's job.
    pub fn system_prompt() -> String {
        r#"You are an expert judge evaluating document improvements. Analyze the original and edited versions to assess:
1. Content accuracy and completeness
2. Structural improvements
3. Clarity and readability
4. Proper handling of topics
5. Overall document quality

Provide specific recommendations if improvements are needed."#
            .to_string()
    }

    /// Build the review prompt comparing the original draft to the revision.
    pub fn build_review_prompt(
        original_content: &str,
        topics: &[String],
        original_version: u32,
        revised_content: &str,
        revised_version: u32,
        revision_notes: &[String],
    ) -> String {
        let notes = if revision_notes.is_empty() {
            "No revision notes provided".to_string()
        } else {
            revision_notes.join("\n")
        };

        format!(
            r#"Review the following document versions:

Original Document:
Topics: {topics}
Version: {original_version}
Content:
{original_content}

Edited Document:
Version: {revised_version}
Changes Made:
{notes}

Content:
{revised_content}

Evaluate the changes and provide structured feedback."#,
            topics = topics.join(", "),
            original_version = original_version,
            original_content = original_content,
            revised_version = revised_version,
            notes = notes,
            revised_content = revised_content,
        )
    }
}
