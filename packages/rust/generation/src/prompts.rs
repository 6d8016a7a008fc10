//! Prompt templates. System prompts are fixed; user prompts carry the keyword.

use seopress_shared::{Intent, Stage};

pub const TITLE_SYSTEM: &str = "You are an SEO copywriter. Write one compelling blog post title \
that contains the target keyword naturally. Keep it under 70 characters. \
Reply with the title only: no quotes, no numbering, no explanation.";

pub const OUTLINE_SYSTEM: &str = "You are an SEO content strategist. Produce a blog post outline \
of 6 to 8 sections. Write each section heading on its own line starting with '## '. \
Reply with the headings only.";

pub const SECTION_SYSTEM: &str = "You are an expert blog writer. Write the body of one section \
of a blog post in Markdown. Use short paragraphs and lists where they help. \
Do not repeat the section heading and do not add a conclusion for the whole article. \
Aim for 250 to 350 words.";

pub const META_SYSTEM: &str = "You write meta descriptions for search results. Write one \
sentence of at most 155 characters that includes the keyword and invites the click. \
Reply with the description only.";

pub const TAGS_SYSTEM: &str = "You tag blog posts. Reply with 3 to 5 short lower-case tags \
separated by commas. No hashtags, no numbering, no explanation.";

pub fn title(keyword: &str, stage: Stage, intent: Intent) -> String {
    format!(
        "Keyword: {keyword}\nFunnel stage: {stage} ({framing})\nSearch intent: {intent}\n\n\
         Write the title.",
        framing = stage.framing(),
    )
}

pub fn outline(title: &str, keyword: &str, stage: Stage) -> String {
    format!(
        "Title: {title}\nKeyword: {keyword}\nFunnel stage: {stage} ({framing})\n\n\
         Write the outline as '## ' headings.",
        framing = stage.framing(),
    )
}

pub fn section(heading: &str, keyword: &str, context: &str) -> String {
    format!(
        "Article context: {context}\nKeyword: {keyword}\nSection heading: {heading}\n\n\
         Write this section's body."
    )
}

pub fn meta(title: &str, keyword: &str, content: &str) -> String {
    format!("Title: {title}\nKeyword: {keyword}\n\nArticle:\n{content}\n\nWrite the meta description.")
}

pub fn tags(title: &str, keyword: &str, content: &str) -> String {
    format!("Title: {title}\nKeyword: {keyword}\n\nArticle:\n{content}\n\nList the tags.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_prompt_asks_for_full_length_body() {
        assert!(SECTION_SYSTEM.contains("250 to 350 words"));
        let user = section("Lighting", "office interior design", "Office Design Guide");
        assert!(user.contains("Section heading: Lighting"));
        assert!(user.contains("Keyword: office interior design"));
    }
}
