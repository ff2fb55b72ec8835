// tests/conversation_flow.rs
//
// Conversation store + classifier + agent, driven through
// Conversations::record_and_respond with a MockAgent.

mod common;

use std::sync::Arc;

use common::{item, Script, ScriptedAdapter};
use goodscoop::agent::MockAgent;
use goodscoop::conversation::{classify, ConversationStore, Conversations, MessageIntent, Role};
use goodscoop::{AdapterRegistry, Aggregator, ContentCategory};

fn aggregator_with_weather() -> Aggregator {
    let mut reg = AdapterRegistry::new();
    reg.register(Arc::new(ScriptedAdapter::new(
        "weather",
        ContentCategory::Weather,
        Script::Items(vec![item(
            "Newcastle Weather: Drizzle, 9C",
            ContentCategory::Weather,
            "OpenWeatherMap",
        )]),
    )));
    Aggregator::new(Arc::new(reg))
}

fn conversations(agent: Arc<MockAgent>) -> (Conversations, Arc<ConversationStore>) {
    let store = Arc::new(ConversationStore::default());
    let conv = Conversations::new(Arc::clone(&store), aggregator_with_weather(), agent);
    (conv, store)
}

#[tokio::test]
async fn history_keeps_the_last_twenty_turns() {
    let agent = Arc::new(MockAgent::new("ok"));
    let (conv, store) = conversations(Arc::clone(&agent));

    for i in 1..=11 {
        conv.record_and_respond(7, &format!("hello {i}"))
            .await
            .expect("mock reply");
    }

    let history = store.history(7);
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "hello 2", "exchange 1 is trimmed away");
    assert_eq!(history[19].role, Role::Assistant);
    assert_eq!(history[18].content, "hello 11");
}

#[tokio::test]
async fn agent_sees_prior_turns_but_not_the_current_message() {
    let agent = Arc::new(MockAgent::new("Hi there!"));
    let (conv, _store) = conversations(Arc::clone(&agent));

    conv.record_and_respond(1, "hey").await.expect("first");
    conv.record_and_respond(1, "how are you").await.expect("second");

    let calls = agent.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].history.is_empty());
    let prior: Vec<&str> = calls[1].history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(prior, vec!["hey", "Hi there!"]);
}

#[tokio::test]
async fn subscribers_have_separate_histories() {
    let agent = Arc::new(MockAgent::new("ok"));
    let (conv, store) = conversations(agent);

    conv.record_and_respond(1, "hi from one").await.expect("one");
    conv.record_and_respond(2, "hi from two").await.expect("two");

    assert_eq!(store.history(1).len(), 2);
    assert_eq!(store.history(2)[0].content, "hi from two");
}

#[tokio::test]
async fn fresh_data_request_embeds_aggregated_content() {
    let agent = Arc::new(MockAgent::new("It's drizzly."));
    let (conv, _store) = conversations(Arc::clone(&agent));

    let reply = conv
        .record_and_respond(3, "what's the weather like?")
        .await
        .expect("reply");
    assert_eq!(reply, "It's drizzly.");

    let prompt = &agent.calls()[0].prompt;
    assert!(prompt.contains("=== WEATHER ==="), "prompt: {prompt}");
    assert!(prompt.contains("Newcastle Weather: Drizzle, 9C"));
    assert!(prompt.contains("what's the weather like?"));
}

#[tokio::test]
async fn follow_up_prompt_points_at_history_only() {
    let agent = Arc::new(MockAgent::new("Sure."));
    let (conv, _store) = conversations(Arc::clone(&agent));

    conv.record_and_respond(4, "tell me more about the news")
        .await
        .expect("reply");

    let prompt = &agent.calls()[0].prompt;
    assert!(prompt.contains("only the earlier messages"), "prompt: {prompt}");
    assert!(!prompt.contains("=== WEATHER ==="), "follow-ups must not refetch");
}

#[tokio::test]
async fn agent_failure_surfaces_and_keeps_the_user_turn() {
    let agent = Arc::new(MockAgent::new("unused").failing(1));
    let (conv, store) = conversations(agent);

    let err = conv.record_and_respond(5, "hi").await;
    assert!(err.is_err());

    let history = store.history(5);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[test]
fn follow_up_wins_over_fresh_data() {
    assert_eq!(classify("tell me more about the news"), MessageIntent::FollowUp);
    assert_eq!(classify("What is the latest news?"), MessageIntent::FreshData);
    assert_eq!(classify("Any updates on the weather?"), MessageIntent::FreshData);
    assert_eq!(classify("Explain that again"), MessageIntent::FollowUp);
    assert_eq!(classify("good morning!"), MessageIntent::Chat);
}
