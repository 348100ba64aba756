use std::io::Write as _;
use std::time::Duration;

use dify_chat_stream::init_observability;
use dify_chat_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability();

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Stream a short greeting.".to_string());
    let client = ChatClient::from_env()?;

    let (abort, signal) = AbortHandle::new();
    let _deadline = abort.abort_after(Duration::from_secs(120));

    let mut stream = client
        .chat_messages_stream(ChatMessageRequest::new(query, "stream-chat-demo"), signal)
        .await?;

    let mut stdout = std::io::stdout();
    while let Some(result) = stream.recv().await {
        match result {
            Ok(event) => {
                print!("{}", event.answer);
                stdout.flush()?;
            }
            Err(failure) => {
                eprintln!("\nstream error: {failure}");
                return Err(failure.into());
            }
        }
    }
    println!();
    Ok(())
}
