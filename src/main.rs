use clap::{Parser, Subcommand};
use dxcoach_lib::config::CoachConfig;
use dxcoach_lib::logging;
use dxcoach_lib::provocations::ProvocationModel;
use dxcoach_lib::twin::Category;
use dxcoach_lib::{CoachSession, LoadOutcome};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dxcoach")]
#[command(about = "Digital transformation coaching scenarios grounded in a philosophy knowledge base")]
struct Args {
    /// Profile key to load and save (overrides DXCOACH_PROFILE)
    #[arg(short, long)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a scenario grounded in the knowledge base
    Rag,
    /// Ask a value-challenging philosophical question
    Challenge,
    /// Generate the next personalized learning step
    Next {
        /// Reinforce the chosen category afterwards
        #[arg(long)]
        reinforce: bool,
    },
    /// Reinforce a category in the digital twin
    Novelty { category: Category },
    /// Set the preferred provocation model
    Prefer { model: ProvocationModel },
    /// Print the digital twin profile
    Show,
    /// Save the current profile
    Save,
    /// Load the saved profile
    Load,
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_profile(session: &CoachSession) {
    let profile = session.profile();
    println!("Preferred model: {}", profile.preferred_model());
    if let Some(strongest) = profile.strongest_category() {
        println!("Strongest category: {}", strongest);
    }
    for (category, score) in profile.preference_scores() {
        println!("  {:<20} {:.1}", category.as_str(), score);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dxcoach=info,dxcoach_lib=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match CoachConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(profile) = args.profile {
        config.profile_key = profile;
    }

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    if let Ok(deleted) = logging::cleanup_old_logs() {
        if deleted > 0 {
            logging::log_session(None, &format!("Removed {} old log files", deleted));
        }
    }

    let mut session = match CoachSession::from_config(&config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Every invocation picks up where the last one left off
    match session.load_progress() {
        Ok(LoadOutcome::Reset { warning }) => eprintln!("warning: {}", warning),
        Ok(_) => {}
        Err(e) => eprintln!("warning: {} (changes will not be saved)", e),
    }

    let mut rng = rand::rng();

    match args.command {
        Command::Rag => {
            let outcome = session.rag_scenario(&mut rng).await;
            print_warnings(&outcome.warnings);
            println!("Generated scenario ({}):\n\n{}", outcome.category, outcome.text);
        }
        Command::Challenge => {
            let challenge = session.value_challenge(&mut rng);
            println!("Selected model: {}", challenge.model);
            println!("Question: {}", challenge.question);
        }
        Command::Next { reinforce } => {
            let outcome = session.next_learning_step(&mut rng).await;
            print_warnings(&outcome.warnings);
            println!("Generated scenario ({}):\n\n{}", outcome.category, outcome.text);
            if reinforce {
                match session.reinforce_outcome(&outcome) {
                    Ok(Some(score)) => println!("\n{} is now at {:.1}", outcome.category, score),
                    Ok(None) => println!("\nTeam scenario shown; nothing reinforced."),
                    Err(e) => eprintln!("warning: {}", e),
                }
            }
        }
        Command::Novelty { category } => match session.introduce_novelty(category) {
            Ok(score) => println!("{} is now at {:.1}", category, score),
            Err(e) => eprintln!("warning: {}", e),
        },
        Command::Prefer { model } => {
            session.set_preferred_model(model);
            match session.save_progress() {
                Ok(()) => println!("Preferred model set to {}", model),
                Err(e) => eprintln!("warning: {}", e),
            }
        }
        Command::Show => print_profile(&session),
        Command::Save => match session.save_progress() {
            Ok(()) => println!("Progress saved."),
            Err(e) => eprintln!("warning: {}", e),
        },
        Command::Load => match session.load_progress() {
            Ok(LoadOutcome::NotFound) => println!("No saved progress yet."),
            Ok(_) => {
                println!("Progress loaded.");
                print_profile(&session);
            }
            Err(e) => eprintln!("warning: {}", e),
        },
    }

    ExitCode::SUCCESS
}
