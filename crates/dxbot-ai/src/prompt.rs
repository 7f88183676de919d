pub const DESCRIPTION_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// User prompt asking for an issue description built from the whole thread.
pub fn build_description_prompt(thread_context: &str) -> String {
    format!(
        "Here is the context from a Slack thread:\n\n{thread_context}\n\n\
         Your task is to analyze the entire thread context and create a detailed description \
         based only on the issue or discussion presented in the messages. Do not include any \
         mention of the action to create a ticket or replies that ask for ticket creation. \
         Focus solely on the core issue or context being discussed. Ensure the description is \
         accurate, complete, and written as a professional explanation, excluding any \
         extraneous details or actions related to ticket creation."
    )
}
