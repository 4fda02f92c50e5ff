/**
 * portal-chat
 *
 * Terminal front end for the maternity portal messaging engine. Lists the
 * signed-in user's contacts, follows the selected conversation and sends
 * whatever is typed on stdin.
 */

use std::sync::Arc;
use std::time::Duration;

use maternity_messaging::client::{Config, HttpPortalApi, MessagingClient};
use maternity_messaging::shared::messaging::{ConversationKey, CurrentUser, PregnancyId, Role, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

const ENV_USER_ID: &str = "PORTAL_USER_ID";
const ENV_USER_ROLE: &str = "PORTAL_USER_ROLE";
const ENV_PREGNANCY_ID: &str = "PORTAL_PREGNANCY_ID";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "maternity_messaging=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let user = current_user_from_env()?;
    tracing::info!(user_id = %user.id, role = %user.role, server = config.server_url(), "starting portal-chat");

    let api = Arc::new(HttpPortalApi::new(config.clone())?);
    let mut client = MessagingClient::new(api, &config, user.clone());

    client.load_contacts().await;
    print_contacts(&client).await;
    client.start()?;

    let printer = {
        let session = Arc::clone(client.session());
        let me = user.id;
        tokio::spawn(async move {
            let mut shown: Option<(Option<ConversationKey>, u64, usize)> = None;
            let mut ticker = tokio::time::interval(Duration::from_millis(250));
            loop {
                ticker.tick().await;
                let view = session.lock().await.view();
                let printed = match shown {
                    Some((key, revision, _)) if key == view.active_key && revision == view.revision => continue,
                    // Same conversation grew: print only the tail
                    Some((key, _, count)) if key == view.active_key && count <= view.messages.len() => count,
                    _ => 0,
                };
                for message in &view.messages[printed..] {
                    let who = if message.from_user_id == me { "you" } else { "them" };
                    println!(
                        "[{}] {}: {}",
                        message.timestamp.format("%H:%M"),
                        who,
                        message.body
                    );
                }
                shown = Some((view.active_key, view.revision, view.messages.len()));
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/contacts" => print_contacts(&client).await,
            _ if line.starts_with("/switch") => {
                let index = line["/switch".len()..].trim().parse::<usize>().ok();
                let contacts = client.view().await.contacts;
                match index.and_then(|n| n.checked_sub(1)).and_then(|n| contacts.get(n)) {
                    Some(contact) => match client.select(contact.user_id).await {
                        Ok(_) => println!("-- now talking to {}", contact.label()),
                        Err(e) => eprintln!("cannot switch: {}", e),
                    },
                    None => eprintln!("usage: /switch N (see /contacts)"),
                }
            }
            body => {
                if let Err(e) = client.send(body).await {
                    eprintln!("not sent: {}", e);
                }
            }
        }
    }

    printer.abort();
    client.shutdown().await;
    Ok(())
}

fn current_user_from_env() -> Result<CurrentUser, BoxError> {
    let id = std::env::var(ENV_USER_ID).map_err(|_| format!("{} is required", ENV_USER_ID))?;
    let id = UserId::from(Uuid::parse_str(id.trim())?);

    let role = std::env::var(ENV_USER_ROLE).map_err(|_| format!("{} is required", ENV_USER_ROLE))?;
    let role = Role::parse(&role)
        .ok_or_else(|| format!("{} must be 'patient' or 'clinician'", ENV_USER_ROLE))?;

    let pregnancy_id = match std::env::var(ENV_PREGNANCY_ID) {
        Ok(raw) if !raw.trim().is_empty() => Some(PregnancyId::from(Uuid::parse_str(raw.trim())?)),
        _ => None,
    };

    Ok(CurrentUser {
        id,
        role,
        pregnancy_id,
    })
}

async fn print_contacts(client: &MessagingClient) {
    let view = client.view().await;
    if let Some(error) = &view.directory_error {
        eprintln!("contacts unavailable: {}", error);
    }
    if view.contacts.is_empty() {
        println!("-- no contacts");
        return;
    }
    for (n, contact) in view.contacts.iter().enumerate() {
        let marker = if view.active_counterpart == Some(contact.user_id) { "*" } else { " " };
        println!("{} {}. {}", marker, n + 1, contact.label());
    }
}
