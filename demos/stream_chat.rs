//! Streaming chat demo
//!
//! Lists the server's models, optionally uploads an image, then streams a
//! completion for a prompt given on the command line.
//!
//! ```bash
//! CONDUIT_BASE_URL=http://localhost:3000 CONDUIT_API_KEY=sk-... \
//!     cargo run --example stream_chat -- "Describe this picture" photo.jpg
//! ```
//!
//! `CONDUIT_MODEL` picks the model; the first listed model is used otherwise.
//! Set `CONDUIT_EMAIL` and `CONDUIT_PASSWORD` to sign in instead of using an
//! API key.

use anyhow::{Context, bail};
use conduit::{Client, ClientOptions, ConversationTurn, get_api_key, get_base_url};
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let prompt = args
        .next()
        .unwrap_or_else(|| "What's the capital of France? Please be brief.".to_string());
    let image_path = args.next();

    let options = ClientOptions::builder()
        .base_url(get_base_url(None))
        .api_key(get_api_key())
        .build()?;
    let mut client = Client::new(options)?;

    if let (Ok(email), Ok(password)) = (
        std::env::var("CONDUIT_EMAIL"),
        std::env::var("CONDUIT_PASSWORD"),
    ) {
        let token = client.sign_in(&email, &password).await?;
        client.set_session_token(token);
        println!("Signed in as {}", email);
    }

    let models = client.fetch_models().await.context("listing models")?;
    println!("Available models: {}", models.join(", "));

    let model = match std::env::var("CONDUIT_MODEL") {
        Ok(model) => model,
        Err(_) => match models.first() {
            Some(model) => model.clone(),
            None => bail!("server reports no models; set CONDUIT_MODEL"),
        },
    };

    let attachment = match image_path {
        Some(path) => {
            let data = std::fs::read(&path).with_context(|| format!("reading {}", path))?;
            let filename = std::path::Path::new(&path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();
            let uploaded = client
                .upload_attachment(&filename, mime_for(&filename), &data)
                .await
                .context("uploading attachment")?;
            println!("Uploaded {} as {}", filename, uploaded.id);
            Some(uploaded)
        }
        None => None,
    };

    let history = vec![ConversationTurn::pending(&prompt, attachment.as_ref())];

    println!("\n[{}] ", model);
    client
        .stream_chat(&history, &model, |delta| {
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        })
        .await?;
    println!();

    Ok(())
}

fn mime_for(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        _ => "application/octet-stream",
    }
}
