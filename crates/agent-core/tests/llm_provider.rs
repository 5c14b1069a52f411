use agent_core::{parse_json_object, LlmClient, LlmError, LlmRequest, MockLlmClient};
use futures::executor::block_on;

#[test]
fn mock_client_serves_script_then_fallback() {
    let client = MockLlmClient::replying("{\"css\": \"#fallback\"}");
    client.push_reply("```json\n{\"css\": \"#first\"}\n```");
    client.push_error(LlmError::transport("connection reset"));

    let request = LlmRequest::new("locate the login button").with_image(vec![0x89, b'P']);

    let first = block_on(client.complete(&request)).expect("scripted reply");
    let parsed = parse_json_object(&first).expect("json");
    assert_eq!(parsed["css"], "#first");

    let second = block_on(client.complete(&request));
    assert!(matches!(second, Err(LlmError::Transport(_))));

    let third = block_on(client.complete(&request)).expect("fallback reply");
    assert!(third.contains("#fallback"));

    assert_eq!(client.call_count(), 3);
    assert!(client.requests()[0].image_png.is_some());
}

#[test]
fn mock_client_without_script_errors() {
    let client = MockLlmClient::new();
    let result = block_on(client.complete(&LlmRequest::new("anything")));
    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}
