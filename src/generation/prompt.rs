//! Prompt text for each generation task.

use crate::generation::GenerationTask;

/// Build the prompt sent to the model for `task`
pub fn build_prompt(task: &GenerationTask) -> String {
    match task {
        GenerationTask::ExampleBody {
            name,
            method,
            path,
            original_body,
        } => {
            let mut prompt = format!(
                "You are an API testing assistant. Generate a realistic, example JSON request body.\n\
                 - ONLY output the raw JSON body.\n\
                 - Do not include any explanation, markdown, or text other than the JSON itself.\n\
                 - The JSON should be appropriate for this request:\n\
                 Request Name: \"{}\"\nMethod: {}\nPath: \"{}\"\n",
                name, method, path
            );
            if let Some(body) = original_body {
                let pretty = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
                prompt.push_str(&format!(
                    "The original request has this structure, use it as a reference for the keys, \
                     but generate new, realistic values:\n{}\n",
                    pretty
                ));
            }
            prompt.push_str("Example JSON Body:\n");
            prompt
        }
        GenerationTask::ExampleQueryParams { name, path } => format!(
            "You are an API testing assistant. For the following GET request, suggest 1 to 3 realistic query parameters.\n\
             - ONLY output a valid JSON array of objects, where each object has a \"key\" and a \"value\" property.\n\
             - Do not include any explanation or other text.\n\
             - If no parameters seem logical, return an empty array [].\n\n\
             Request Name: \"{}\"\nPath: \"{}\"\n\nExample JSON Array:\n",
            name, path
        ),
        GenerationTask::TestScript { name, request } => {
            let pretty =
                serde_json::to_string_pretty(request).unwrap_or_else(|_| request.to_string());
            format!(
                "You are an API testing assistant. Write a Postman test script (JavaScript using the pm.* API) \
                 for the request below. Check the status code, response time and the shape of the JSON response.\n\
                 - ONLY output the JavaScript code, without markdown fences or explanation.\n\n\
                 Request Name: \"{}\"\nRequest:\n{}\n",
                name, pretty
            )
        }
        GenerationTask::SecurityAudit { summary } => format!(
            "As an API security and performance reviewer, audit the following collection.\n\
             Point out missing authentication, sensitive data in URLs, missing or inconsistent headers, \
             and endpoints that are likely to be slow or abusable. Group findings by severity.\n\n\
             {}\n\nYour audit report:\n",
            summary
        ),
        GenerationTask::ApiDocs { summary } => format!(
            "As a technical writer, produce reference documentation in Markdown for the API described below.\n\
             Give each endpoint a heading, its method and path, a short description and an example request.\n\n\
             {}\n\nDocumentation:\n",
            summary
        ),
        GenerationTask::CollectionAnalysis { summary } => format!(
            "As an expert API analyst, analyze the following Postman collection summary.\n\
             Provide a concise, high-level explanation of the API's primary purpose and functionality.\n\
             Use the endpoint details, including any specified request body keys, to inform your analysis.\n\n\
             Collection Summary:\n{}\n\nYour analysis:\n",
            summary
        ),
    }
}
