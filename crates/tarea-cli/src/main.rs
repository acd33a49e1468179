use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tarea_core::{
    ApiClient, AuthManager, AuthState, ConfigLoader, FileSessionStore, GeminiClient, SessionStore,
    StatusMessage, Task, TextGenerator, TodoStore, DEFAULT_CONFIG_FILE,
};

#[derive(Parser, Debug)]
#[clap(
    name = "Tarea",
    version = "0.1.0",
    about = "To-do client with AI-generated descriptions"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(
        long,
        short,
        default_value = DEFAULT_CONFIG_FILE,
        help = "Path to the YAML configuration file"
    )]
    config: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new account
    Register { username: String, password: String },
    /// Log in and store the access token
    Login { username: String, password: String },
    /// Drop the stored access token
    Logout,
    /// Show whether a session is active
    Whoami,
    /// List all tasks
    List,
    /// Add a task
    Add {
        title: String,
        #[clap(long, short)]
        description: Option<String>,
    },
    /// Flip a task between done and pending
    Toggle { id: i64 },
    /// Delete a task
    Rm { id: i64 },
    /// Generate an image description from a concept
    Generate { prompt: String },
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet. Add one!");
        return;
    }
    for task in tasks {
        let mark = if task.completed { "x" } else { " " };
        match &task.description {
            Some(description) => {
                println!("[{}] {:>4}  {} - {}", mark, task.id, task.title, description)
            }
            None => println!("[{}] {:>4}  {}", mark, task.id, task.title),
        }
    }
}

/// Print the outcome and convert an error status into a non-zero exit.
fn finish(status: Option<&StatusMessage>) -> Result<()> {
    let Some(status) = status else {
        return Ok(());
    };
    if status.is_error() {
        eprintln!("{}", status);
        std::process::exit(1);
    }
    println!("{}", status);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&cli.log_level),
    )
    .init();

    let config = ConfigLoader::load_or_default(&cli.config).await?;
    let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.token_path()?));
    let api = ApiClient::new(config.api.base_url.clone(), session.clone());

    match cli.command {
        Commands::Register { username, password } => {
            let auth = AuthManager::new(api, session);
            finish(Some(&auth.register(&username, &password).await))
        }
        Commands::Login { username, password } => {
            let auth = AuthManager::new(api, session);
            finish(Some(&auth.login(&username, &password).await))
        }
        Commands::Logout => {
            let auth = AuthManager::new(api, session);
            finish(Some(&auth.logout()))
        }
        Commands::Whoami => {
            let auth = AuthManager::new(api, session);
            match auth.state() {
                AuthState::Authenticated => println!("Logged in."),
                AuthState::Unauthenticated => println!("Not logged in."),
            }
            Ok(())
        }
        Commands::List => {
            let mut store = TodoStore::new(api);
            store.refresh().await;
            print_tasks(store.tasks());
            finish(store.status())
        }
        Commands::Add { title, description } => {
            let mut store = TodoStore::new(api);
            store.create(&title, description.as_deref()).await;
            finish(store.status())
        }
        Commands::Toggle { id } => {
            let mut store = TodoStore::new(api);
            store.toggle_complete(id).await;
            finish(store.status())
        }
        Commands::Rm { id } => {
            let mut store = TodoStore::new(api);
            store.remove(id).await;
            finish(store.status())
        }
        Commands::Generate { prompt } => {
            let gemini = match GeminiClient::from_config(&config.gemini) {
                Ok(client) => client,
                Err(err) => return finish(Some(&StatusMessage::failure("Cannot generate", &err))),
            };
            match gemini.generate_description(&prompt).await {
                Ok(text) => {
                    println!("{}", text);
                    Ok(())
                }
                Err(err) => {
                    log::error!("Generation failed: {}", err);
                    finish(Some(&StatusMessage::failure("Failed to generate a description", &err)))
                }
            }
        }
    }
}
