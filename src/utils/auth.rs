//! Request decoration for the assistant API.

/// Version header required by the threads and runs endpoints.
pub const ASSISTANTS_BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Add bearer authentication and the assistants beta header to a request.
pub fn add_assistant_headers(
    request: reqwest::RequestBuilder,
    api_key: &str,
) -> reqwest::RequestBuilder {
    request
        .header("Authorization", format!("Bearer {api_key}"))
        .header(ASSISTANTS_BETA_HEADER.0, ASSISTANTS_BETA_HEADER.1)
}
