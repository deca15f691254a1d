use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};

use teledoc::api::TeledocClient;
use teledoc::chat::{self, ChatFlow};
use teledoc::config::ClientConfig;
use teledoc::gate::{landing_route, AccessGate, GateDecision, Route};
use teledoc::models::{
    unread_review_count, LocalAttachment, LoginRequest, ProfileUpdate, ReportQuery, ReviewStatus,
    Role,
};
use teledoc::notify::{Notification, RetryAction, Severity};
use teledoc::review::{DateRange, ReviewFlow, UrgencyFilter, ViewMode};
use teledoc::session::{SessionError, SessionStore};

/// Chat input line that re-runs the last failed step.
const RETRY_COMMAND: &str = "/retry";

#[derive(Parser, Debug)]
#[command(name = "teledoc", version, about = "Teledoc telehealth client.")]
struct Cli {
    /// Backend base URL. Overrides TELEDOC_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session directory. Overrides TELEDOC_SESSION_DIR.
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is reachable.
    Health,
    /// Sign in with a Google identity token.
    Login {
        #[arg(long)]
        id_token: String,
    },
    /// Complete the profile (first sign-in, or missing age/sex).
    Onboard {
        /// Needed when no session exists yet.
        #[arg(long)]
        id_token: Option<String>,
        #[arg(long, value_enum, default_value_t = RoleArg::Patient)]
        role: RoleArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        sex: String,
    },
    Logout,
    /// Show the signed-in profile.
    Whoami,
    /// Chat with the consultation agent. Each stdin line is one message;
    /// `/retry` re-runs the last failed send or diagnosis.
    Chat {
        /// Resume an existing chat instead of starting one.
        #[arg(long)]
        chat_id: Option<String>,
        /// Files sent with the first message.
        #[arg(long)]
        attach: Vec<PathBuf>,
    },
    /// List doctor reports.
    Reports {
        #[arg(long, value_enum, default_value_t = ViewArg::Pending)]
        view: ViewArg,
        /// Patient name or id.
        #[arg(long, default_value = "")]
        search: String,
        /// all, critical, routine, or an exact urgency label.
        #[arg(long, default_value = "all")]
        urgency: String,
        /// First day, YYYY-MM-DD.
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD. Requires --from.
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Approve or reject a report.
    Review {
        report_id: String,
        #[command(flatten)]
        decision: DecisionArg,
        #[arg(long, default_value = "")]
        comments: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Pending,
    Approved,
    Search,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct DecisionArg {
    #[arg(long)]
    approve: bool,
    #[arg(long)]
    reject: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    teledoc::init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.api_url {
        Some(url) => ClientConfig::new(url)?,
        None => ClientConfig::from_env().context("Invalid TELEDOC_* environment")?,
    };
    if let Some(dir) = cli.session_dir {
        config.session_dir = dir;
    }

    let session = Arc::new(SessionStore::open(&config.session_dir));
    let client = TeledocClient::new(config, session.clone()).context("Cannot build HTTP client")?;
    let gate = AccessGate::new(session.clone());

    match cli.command {
        Command::Health => {
            let status = client.health().await?;
            println!("{}", if status.is_ok() { "ok" } else { status.status.as_str() });
        }
        Command::Login { id_token } => match session.login(&client, &LoginRequest::new(id_token)).await {
            Ok(profile) => {
                println!("Signed in as {} ({})", profile.display_name(), profile.role);
                println!("Next: {}", landing_route(&profile));
            }
            Err(SessionError::ProfileNotFound) => {
                println!("No profile yet. Run `teledoc onboard --id-token ...` to register.");
            }
            Err(e) => return Err(e).context("Login failed"),
        },
        Command::Onboard { id_token, role, name, age, sex } => {
            let update = ProfileUpdate::demographics(&name, age, &sex);
            onboard(&client, &session, id_token, role.into(), &update).await?;
        }
        Command::Logout => {
            session.logout();
            println!("Signed out");
        }
        Command::Whoami => match session.profile() {
            Some(profile) => {
                println!("{} <{}>", profile.display_name(), profile.email);
                println!("role: {}", profile.role);
                if let Some(patient_id) = &profile.patient_id {
                    println!("patient id: {patient_id}");
                }
                println!("home: {}", landing_route(&profile));
                if let (Role::Patient, Some(patient_id)) = (profile.role, &profile.patient_id) {
                    match client.list_patient_reports(patient_id, &ReportQuery::default()).await {
                        Ok(reports) => println!("unread reviews: {}", unread_review_count(&reports)),
                        Err(e) => tracing::warn!(error = %e, "Cannot count unread reviews"),
                    }
                }
            }
            None => println!("Not signed in"),
        },
        Command::Chat { chat_id, attach } => {
            let route = chat_id.clone().map_or(Route::NewChat, Route::Chat);
            require(&gate, &route)?;
            run_chat(&client, &session, chat_id, attach).await?;
        }
        Command::Reports { view, search, urgency, from, to } => {
            require(&gate, &Route::DoctorReports)?;
            let mut flow = ReviewFlow::new(view.into());
            {
                let filter = flow.filter_mut();
                filter.search = search;
                filter.urgency = UrgencyFilter::parse(&urgency);
                filter.range = from.map(|from| DateRange { from, to });
            }
            if let Err(e) = flow.refresh(&client).await {
                print_notifications(flow.take_notifications());
                return Err(e).context("Cannot load reports");
            }
            println!("{} ({} pending)", flow.filter().view.title(), flow.pending_count());
            for report in flow.rows() {
                println!(
                    "{}  {:<10} {:<24} {}",
                    report.report_id,
                    report.urgency().label(),
                    report.patient_name.as_deref().unwrap_or(&report.patient_id),
                    report.created_at.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Review { report_id, decision, comments } => {
            require(&gate, &Route::DoctorReport(report_id.clone()))?;
            let mut flow = ReviewFlow::new(ViewMode::Search);
            flow.open_detail(&client, &report_id)
                .await
                .with_context(|| format!("Cannot load report {report_id}"))?;
            let dialog = flow.open_review(&report_id)?;
            dialog.status = if decision.approve {
                ReviewStatus::Approved
            } else {
                ReviewStatus::Rejected
            };
            dialog.comments = comments;
            let result = flow.submit(&client).await;
            print_notifications(flow.take_notifications());
            result.context("Review not recorded")?;
        }
    }

    Ok(())
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Patient => Role::Patient,
            RoleArg::Doctor => Role::Doctor,
        }
    }
}

impl From<ViewArg> for ViewMode {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Pending => ViewMode::Pending,
            ViewArg::Approved => ViewMode::Approved,
            ViewArg::Search => ViewMode::Search,
        }
    }
}

fn require(gate: &AccessGate, route: &Route) -> anyhow::Result<()> {
    match gate.check(route) {
        GateDecision::Render => Ok(()),
        GateDecision::Redirect(Route::Login) => bail!("Not signed in. Run `teledoc login` first."),
        GateDecision::Redirect(Route::Onboarding) => {
            bail!("Profile incomplete. Run `teledoc onboard` first.")
        }
        GateDecision::Redirect(other) => bail!("Redirected to {other}"),
        GateDecision::Denied => bail!("Access denied for {route}"),
    }
}

async fn onboard(
    client: &TeledocClient,
    session: &SessionStore,
    id_token: Option<String>,
    role: Role,
    update: &ProfileUpdate,
) -> anyhow::Result<()> {
    // Signed-in patient filling in missing demographics.
    if let Some(patient_id) = session.profile().and_then(|p| p.patient_id) {
        client
            .update_patient_profile(&patient_id, update)
            .await
            .context("Cannot save profile")?;
        session.update_profile(update)?;
        println!("Profile updated");
        return Ok(());
    }

    let Some(id_token) = id_token else {
        bail!("--id-token is required to register a new profile");
    };
    let profile = session
        .login(client, &LoginRequest::onboarding(id_token, role, update))
        .await
        .context("Registration failed")?;
    println!("Registered as {} ({})", profile.display_name(), profile.role);
    println!("Next: {}", landing_route(&profile));
    Ok(())
}

async fn run_chat(
    client: &TeledocClient,
    session: &SessionStore,
    chat_id: Option<String>,
    attach: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let chat_id = match chat_id {
        Some(id) => id,
        None => match chat::start_consultation(client).await {
            Ok(Route::Chat(id)) => id,
            Ok(other) => bail!("Unexpected route {other}"),
            Err(notification) => {
                print_notifications(vec![notification]);
                bail!("Cannot start a consultation");
            }
        },
    };

    let patient_id = session.profile().and_then(|p| p.patient_id);
    let mut flow = ChatFlow::new(chat_id, patient_id);
    if let Err(e) = flow.load(client).await {
        print_notifications(flow.take_notifications());
        return Err(e).context("Cannot load chat");
    }
    println!("Chat {} ({})", flow.chat_id(), flow.title().unwrap_or("New consultation"));
    for message in flow.messages() {
        println!("[{}] {}", message.role, message.content);
    }

    let mut files = attach
        .iter()
        .map(|path| {
            LocalAttachment::from_path(path).with_context(|| format!("Cannot read {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut retry: Option<RetryAction> = None;
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        let seen = flow.messages().len();

        // The optimistic echo of a new message is already on screen.
        let echoed = if text == RETRY_COMMAND {
            match retry.take() {
                Some(RetryAction::SendMessage { local_id, .. }) => {
                    flow.resend(client, local_id).await?;
                }
                Some(RetryAction::RunDiagnosis { .. }) => {
                    flow.run_diagnosis(client).await?;
                }
                _ => {
                    eprintln!("Nothing to retry.");
                    continue;
                }
            }
            0
        } else {
            if text.is_empty() && files.is_empty() {
                continue;
            }
            flow.send(client, text, std::mem::take(&mut files)).await?;
            1
        };

        for message in flow.messages().iter().skip(seen + echoed) {
            println!("[{}] {}", message.role, message.content);
        }
        let notifications = flow.take_notifications();
        if let Some(action) = notifications.iter().find_map(|n| n.retry.clone()) {
            retry = Some(action);
        }
        print_notifications(notifications);
        if retry.is_some() {
            eprintln!("Type {RETRY_COMMAND} to try again.");
        }

        if let Some(report_id) = flow.report_id() {
            println!("Report ready: {}", Route::Report(report_id.to_string()));
            break;
        }
    }

    flow.close();
    Ok(())
}

fn print_notifications(notifications: Vec<Notification>) {
    for n in notifications {
        let tag = match n.severity {
            Severity::Info => "info",
            Severity::Error => "error",
        };
        let retry = if n.is_retryable() { " (retry possible)" } else { "" };
        eprintln!("[{tag}] {}: {}{retry}", n.title, n.description);
    }
}
