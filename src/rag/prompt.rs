//! Prompt template handed to the completion model.

pub const DEFAULT_INSTRUCTION: &str = "Answer the question based on the context below. \
The context is derived from information about various car aspects, including Volvo cars, \
car hardware, software in cars etc. Provide detailed answers about vehicle features, systems, \
and car technologies. If the question can't be answered based on the context, say \"I don't know\"";

pub fn build_prompt(instruction: &str, context: &str, question: &str) -> String {
    format!(
        "{}\n\nContext: {}\n\n---\n\nQuestion: {}\nAnswer:",
        instruction, context, question
    )
}
