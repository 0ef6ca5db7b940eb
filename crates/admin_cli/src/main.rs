use std::{error::Error, io::Write};

use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, ClearType},
};
use engine::{Currency, Engine, FeePolicy, NewProjectCmd};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

fn days(count: i64) -> CliResult<TimeDelta> {
    TimeDelta::try_days(count).ok_or_else(|| format!("{count} days is out of range").into())
}

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "caravan_admin")]
#[command(about = "Operator utilities for Caravan (users, projects, sweeps, payouts)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./caravan.db?mode=rwc"
    )]
    database_url: String,

    /// Platform fee in basis points applied to settlements run from here.
    #[arg(long, env = "CARAVAN_FEES__PLATFORM_FEE_BPS", default_value_t = 0)]
    platform_fee_bps: u16,

    #[arg(long, env = "CARAVAN_FEES__OPERATOR_FEE_BPS", default_value_t = 0)]
    operator_fee_bps: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Project(Project),
    /// Cancel stale listings and refund overdue under-funded projects.
    Sweep(SweepArgs),
    /// Split an income period across the current holders of a project.
    Distribute(DistributeArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Project {
    #[command(subcommand)]
    command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    Create(ProjectCreateArgs),
    Activate(ProjectIdArgs),
    Close(ProjectIdArgs),
    Refund(ProjectIdArgs),
    /// Let a user manage the project with the platform role.
    GrantPlatform(GrantPlatformArgs),
}

#[derive(Args, Debug)]
struct ProjectCreateArgs {
    #[arg(long)]
    operator: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    vehicle_model: Option<String>,
    #[arg(long)]
    total_shares: i64,
    /// Price of one share in minor units.
    #[arg(long)]
    unit_price: i64,
    /// Length of the fundraising window.
    #[arg(long, default_value_t = 30)]
    days: i64,
    #[arg(long, default_value = "CNY")]
    currency: String,
}

#[derive(Args, Debug)]
struct ProjectIdArgs {
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct GrantPlatformArgs {
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[arg(long, default_value_t = 7)]
    listing_ttl_days: i64,
}

#[derive(Args, Debug)]
struct DistributeArgs {
    #[arg(long)]
    project: Uuid,
    /// Inclusive start, RFC3339.
    #[arg(long)]
    start: DateTime<Utc>,
    /// Exclusive end, RFC3339.
    #[arg(long)]
    end: DateTime<Utc>,
    /// Income in minor units.
    #[arg(long)]
    total: i64,
}

/// Leaves raw mode when dropped, also on early returns.
struct RawMode;

impl RawMode {
    fn enable() -> CliResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn status_line(out: &mut impl Write, text: &str) -> CliResult<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(text)
    )?;
    out.flush()?;
    Ok(())
}

/// Reads a line without echoing it, printing `*` per character.
fn read_hidden(prompt: &str) -> CliResult<String> {
    let _raw = RawMode::enable()?;
    let mut out = std::io::stderr();
    status_line(&mut out, prompt)?;

    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Enter => break,
            KeyCode::Char('c') if ctrl => {
                status_line(&mut out, "\r\n")?;
                return Err("interrupted".into());
            }
            KeyCode::Backspace if secret.pop().is_some() => {
                execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
            }
            KeyCode::Char(ch) if !ctrl => {
                secret.push(ch);
                execute!(out, Print("*"))?;
            }
            _ => {}
        }
        out.flush()?;
    }

    execute!(out, Print("\r\n"))?;
    Ok(secret)
}

fn new_password() -> CliResult<String> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let first = read_hidden("Password: ")?;
        if first.is_empty() {
            status_line(&mut out, "Password must not be empty.\r\n")?;
            continue;
        }
        if read_hidden("Confirm password: ")? == first {
            return Ok(first);
        }
        status_line(&mut out, "Passwords do not match.\r\n")?;
    }
    Err("too many attempts".into())
}

async fn connect_db(database_url: &str) -> CliResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn create_user(db: &DatabaseConnection, username: String) -> CliResult<()> {
    if users::Entity::find_by_id(username.clone())
        .one(db)
        .await?
        .is_some()
    {
        return Err(format!("user already exists: {username}").into());
    }

    let password = new_password()?;
    users::Entity::insert(users::ActiveModel {
        username: Set(username.clone()),
        password: Set(password),
    })
    .exec(db)
    .await?;
    println!("created user: {username}");
    Ok(())
}

async fn run_project(
    engine: &Engine,
    db: &DatabaseConnection,
    command: ProjectCommand,
) -> CliResult<()> {
    let now = Utc::now();
    match command {
        ProjectCommand::Create(args) => {
            let closes_at = now
                .checked_add_signed(days(args.days)?)
                .ok_or("closing date is out of range")?;
            if users::Entity::find_by_id(args.operator.clone())
                .one(db)
                .await?
                .is_none()
            {
                return Err(format!("user not found: {}", args.operator).into());
            }
            let mut cmd = NewProjectCmd::new(
                args.title,
                args.operator,
                args.total_shares,
                args.unit_price,
                now,
                closes_at,
            )
            .currency(Currency::try_from(args.currency.as_str())?);
            if let Some(model) = args.vehicle_model {
                cmd = cmd.vehicle_model_id(model);
            }
            let project = engine.create_project(cmd).await?;
            println!(
                "created project: {} ({}), target {} {}",
                project.title,
                project.id,
                project.target_amount_minor,
                project.currency.code()
            );
        }
        ProjectCommand::Activate(args) => {
            let project = engine.activate(args.id, now).await?;
            println!("project {} is {}", project.id, project.status.as_str());
        }
        ProjectCommand::Close(args) => {
            let project = engine.close(args.id, now).await?;
            println!("project {} is {}", project.id, project.status.as_str());
        }
        ProjectCommand::Refund(args) => {
            let (project, refunds) = engine.refund(args.id, now).await?;
            println!("project {} is {}", project.id, project.status.as_str());
            for refund in refunds {
                println!(
                    "  {}: {} shares, {} {}",
                    refund.owner_id,
                    refund.share_count,
                    refund.amount_minor,
                    project.currency.code()
                );
            }
        }
        ProjectCommand::GrantPlatform(args) => {
            engine.grant_platform(args.id, &args.user).await?;
            println!("{} now manages project {}", args.user, args.id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder()
        .database(db.clone())
        .fee_policy(FeePolicy::new(cli.platform_fee_bps, cli.operator_fee_bps)?)
        .build()
        .await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => create_user(&db, args.username).await?,
        Command::Project(Project { command }) => run_project(&engine, &db, command).await?,
        Command::Sweep(args) => {
            let ttl = days(args.listing_ttl_days)?;
            let report = engine.sweep(Utc::now(), ttl).await?;
            println!(
                "cancelled {} listings, refunded {} projects",
                report.cancelled.len(),
                report.refunded.len()
            );
        }
        Command::Distribute(args) => {
            let (record, payouts) = engine
                .distribute(args.project, args.start, args.end, args.total, Utc::now())
                .await?;
            println!("income record {}", record.id);
            for payout in payouts {
                println!(
                    "  {}: {} shares -> {}",
                    payout.owner_id, payout.share_count, payout.amount_minor
                );
            }
        }
    }

    Ok(())
}
