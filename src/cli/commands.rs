use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;

use crate::{
    api::{ChannelMessage, ChatMessage, ChatRole, ScanImage, ScanImages, TaskCompletion},
    app::{init_config, AppState, Config},
    constants::CHAT_FAILURE_REPLY,
    forms::{LoginForm, OnboardingForm, SignupForm},
    gate::{AccessState, GateRouter, MainTab, Screen},
    utils::{log_info, log_warn, Action, CannonError, CannonResult, Notice},
};

use super::Commands;

/// Handle CLI subcommands
pub async fn handle_command(command: &Commands, config: Config) -> Result<()> {
    if let Commands::Init = command {
        return init();
    }

    let app = AppState::new(config).context("Failed to set up the API client")?;

    if let Commands::Logout = command {
        app.session.logout();
        println!("{} Signed out", "[OK]".green());
        return Ok(());
    }

    if let Commands::Status = command {
        return show_status(&app).await;
    }

    restore(&app).await?;
    let router = app.router();

    match command {
        Commands::Init | Commands::Logout | Commands::Status => Ok(()),
        Commands::Login { email, password } => {
            enter(&router, Screen::Login)?;
            let form = LoginForm::new(email.as_str(), password.as_str());
            notify(Action::Login, app.session.login(&form).await)?;
            println!("{} Signed in as {}", "[OK]".green(), form.email().bold());
            print_next_step(router.state());
            Ok(())
        }
        Commands::Signup {
            email,
            password,
            confirm,
        } => {
            enter(&router, Screen::Signup)?;
            let form = SignupForm::new(email.as_str(), password.as_str(), confirm.as_str());
            notify(Action::Signup, app.session.signup(&form).await)?;
            println!("{} Account created for {}", "[OK]".green(), form.email().bold());
            print_next_step(router.state());
            Ok(())
        }
        Commands::Onboard { goals, experience } => {
            enter(&router, Screen::Onboarding)?;
            let mut form = OnboardingForm::new();
            for goal in goals {
                notify(Action::Onboarding, form.toggle_goal(goal))?;
            }
            notify(Action::Onboarding, form.set_experience(experience))?;
            notify(Action::Onboarding, app.session.complete_onboarding(&form).await)?;
            println!("{} Onboarding saved", "[OK]".green());
            print_next_step(router.state());
            Ok(())
        }
        Commands::Scan { front, left, right } => {
            enter(&router, Screen::FaceScan)?;
            scan(&app, &router, front, left, right).await
        }
        Commands::Result => {
            if router.state() == AccessState::FullAccess {
                enter_tab(&router, MainTab::Home)?;
            } else {
                enter(&router, Screen::BlurredResult)?;
            }
            show_result(&app).await
        }
        Commands::Courses => {
            enter_tab(&router, MainTab::Home)?;
            show_courses(&app).await
        }
        Commands::StartCourse { course_id } => {
            enter_tab(&router, MainTab::Home)?;
            let enrollment = notify(Action::Load, app.api.start_course(course_id).await)?;
            println!("{} {}", "[OK]".green(), enrollment.message);
            Ok(())
        }
        Commands::CompleteTask {
            course_id,
            task_id,
            stage,
        } => {
            enter_tab(&router, MainTab::Home)?;
            let completion = TaskCompletion {
                task_id: task_id.clone(),
                stage_number: *stage,
            };
            let progress = notify(
                Action::Load,
                app.api.complete_task(course_id, &completion).await,
            )?;
            println!(
                "{} Task done, course {:.0}% complete",
                "[OK]".green(),
                progress.progress_percentage
            );
            Ok(())
        }
        Commands::Events => {
            enter_tab(&router, MainTab::Home)?;
            show_events(&app).await
        }
        Commands::Chat { message } => {
            enter_tab(&router, MainTab::Chat)?;
            chat(&app, message.as_deref()).await
        }
        Commands::Forums => {
            enter_tab(&router, MainTab::Forums)?;
            show_forums(&app).await
        }
        Commands::Channel { channel_id, watch } => {
            enter_tab(&router, MainTab::Forums)?;
            show_channel(&app, channel_id, *watch).await
        }
        Commands::Post {
            channel_id,
            message,
        } => {
            enter_tab(&router, MainTab::Forums)?;
            post(&app, channel_id, message).await
        }
        Commands::Leaderboard => {
            enter_tab(&router, MainTab::Rank)?;
            show_leaderboard(&app).await
        }
        Commands::Profile { limit } => {
            enter_tab(&router, MainTab::Home)?;
            show_profile(&app, *limit).await
        }
        Commands::Subscribe => {
            enter(&router, Screen::Payment)?;
            let checkout = notify(Action::Checkout, app.session.start_checkout().await)?;
            println!("Open this page to complete your subscription:");
            println!("  {}", checkout.checkout_url.cyan().underline());
            println!();
            println!("When payment is done, run {}", "cannon refresh".bold());
            Ok(())
        }
        Commands::Refresh => {
            notify(Action::Load, app.session.refresh_user().await)?;
            println!("{} Account refreshed", "[OK]".green());
            print_next_step(router.state());
            Ok(())
        }
        Commands::ActivateTest => {
            enter(&router, Screen::Payment)?;
            notify(
                Action::TestActivation,
                app.session.activate_test_subscription().await,
            )?;
            println!("{} Test subscription active", "[OK]".green());
            print_next_step(router.state());
            Ok(())
        }
    }
}

fn init() -> Result<()> {
    println!("Initializing Cannon configuration...");
    match init_config()? {
        Some(path) => println!("{} Wrote {}", "[OK]".green(), path.display()),
        None => println!("Configuration already exists, leaving it alone"),
    }
    Ok(())
}

/// Turn a failed action into the notice the user sees
fn notify<T>(action: Action, result: CannonResult<T>) -> Result<T> {
    result.map_err(|e| {
        let notice = Notice::for_failure(action, &e);
        anyhow::Error::new(e).context(notice.to_string())
    })
}

async fn restore(app: &AppState) -> Result<()> {
    app.session
        .restore()
        .await
        .map(|_| ())
        .context("Could not restore your session; stored credentials were kept, try again")
}

fn enter(router: &GateRouter, screen: Screen) -> Result<()> {
    router
        .navigate(screen)
        .map(|_| ())
        .with_context(|| next_step(router.state()))
}

fn enter_tab(router: &GateRouter, tab: MainTab) -> Result<()> {
    router
        .open_tab(tab)
        .map(|_| ())
        .with_context(|| next_step(router.state()))
}

/// What the user should do to move past the current gate state
fn next_step(state: AccessState) -> &'static str {
    match state {
        AccessState::Loading => "Your session is still being restored",
        AccessState::Unauthenticated => {
            "Sign in with `cannon login` or create an account with `cannon signup`"
        }
        AccessState::Onboarding => "Finish onboarding with `cannon onboard`",
        AccessState::FirstScan => "Take your first face scan with `cannon scan`",
        AccessState::Paywalled => "Unlock your full results with `cannon subscribe`",
        AccessState::FullAccess => "You have full access",
    }
}

fn print_next_step(state: AccessState) {
    if state != AccessState::FullAccess {
        println!("Next: {}", next_step(state).yellow());
    }
}

async fn show_status(app: &AppState) -> Result<()> {
    println!("Cannon Status:");
    println!();
    println!("  Server: {}", app.config.api.base_url);

    match app.session.restore().await {
        Ok(_) => {}
        Err(CannonError::RestoreFailed { attempts, reason }) => {
            println!(
                "  {} Session: could not reach the server after {} attempt(s): {}",
                "[ERROR]".red(),
                attempts,
                reason
            );
            println!("      Stored credentials were kept. Check your connection and retry.");
            return Err(CannonError::RestoreFailed { attempts, reason }.into());
        }
        Err(e) => return Err(e.into()),
    }

    let state = app.router().state();
    match app.session.stored_email() {
        Some(email) if state != AccessState::Unauthenticated => {
            println!("  {} Account: {}", "[OK]".green(), email)
        }
        _ => println!("  {} Account: signed out", "[WARNING]".yellow()),
    }

    println!("  Access: {}", state.display_name().bold());
    let reachable: Vec<&str> = state
        .allowed_targets()
        .iter()
        .map(Screen::display_name)
        .collect();
    println!("  Reachable screens: {}", reachable.join(", "));
    if state == AccessState::FullAccess {
        let tabs: Vec<&str> = MainTab::ALL.iter().map(MainTab::label).collect();
        println!("  Tabs: {}", tabs.join(" | "));
    } else {
        println!("  Next: {}", next_step(state).yellow());
    }
    println!();
    Ok(())
}

async fn read_image(path: &Path) -> Result<ScanImage> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo.jpg")
        .to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let content_type = match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };

    Ok(ScanImage {
        file_name,
        content_type: content_type.to_string(),
        data: data.into(),
    })
}

async fn scan(
    app: &AppState,
    router: &GateRouter,
    front: &Path,
    left: &Path,
    right: &Path,
) -> Result<()> {
    let (front, left, right) =
        futures::try_join!(read_image(front), read_image(left), read_image(right))?;
    let images = ScanImages { front, left, right };

    log_info("📸", "Uploading photos and analyzing, this can take a minute...");
    let analysis = notify(Action::Scan, app.session.complete_scan(&images).await)?;
    println!("{} {}", "[OK]".green(), analysis.message);

    if router.state() == AccessState::Paywalled {
        println!("Your results are ready. Run {} to unlock them.", "cannon subscribe".bold());
    } else {
        println!("Run {} to see your results.", "cannon result".bold());
    }
    Ok(())
}

async fn show_result(app: &AppState) -> Result<()> {
    let scan = notify(Action::Load, app.api.get_latest_scan().await)?;

    println!("Latest scan ({})", scan.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(status) = &scan.processing_status {
        println!("  Status: {}", status);
    }
    match scan.overall_score() {
        Some(score) => println!("  Overall score: {}", format!("{:.1}", score).bold()),
        None => println!("  Overall score: pending"),
    }

    if scan.is_locked() {
        println!(
            "  {} Detailed breakdown is locked. Run {} to unlock it.",
            "[LOCKED]".yellow(),
            "cannon subscribe".bold()
        );
    } else if let Some(analysis) = &scan.analysis {
        let pretty = serde_json::to_string_pretty(analysis)?;
        println!("{}", pretty);
    }
    Ok(())
}

async fn show_courses(app: &AppState) -> Result<()> {
    let (courses, progress) = notify(
        Action::Load,
        futures::try_join!(app.api.get_courses(), app.api.get_course_progress()),
    )?;

    if courses.courses.is_empty() {
        println!("No courses available yet");
        return Ok(());
    }

    println!("Courses:");
    for course in &courses.courses {
        let done = progress
            .progress
            .iter()
            .find(|p| p.course_id == course.id)
            .map(|p| format!("{:.0}%", p.progress_percentage).green().to_string())
            .unwrap_or_else(|| "not started".dimmed().to_string());
        println!(
            "  • {} [{}] {} weeks, {} tasks, {}",
            course.title.bold(),
            course.category,
            course.estimated_weeks,
            course.total_tasks(),
            done
        );
        println!("      id: {}", course.id.dimmed());
    }
    Ok(())
}

async fn show_events(app: &AppState) -> Result<()> {
    let (events, live) = notify(
        Action::Load,
        futures::try_join!(app.api.get_events(), app.api.get_live_events()),
    )?;

    for event in &live.events {
        println!("{} {} {}", "[LIVE]".red().bold(), event.title, event.tiktok_link.cyan());
    }

    if events.events.is_empty() {
        println!("No upcoming events");
        return Ok(());
    }

    println!("Upcoming events:");
    for event in &events.events {
        println!(
            "  • {} {} ({} min)",
            event.scheduled_at.format("%a %b %e %H:%M"),
            event.title.bold(),
            event.duration_minutes
        );
    }
    Ok(())
}

fn print_chat_message(message: &ChatMessage) {
    match message.role {
        ChatRole::User => println!("{} {}", "you:".bold(), message.content),
        ChatRole::Assistant => println!("{} {}", "cannon:".cyan().bold(), message.content),
    }
}

async fn chat(app: &AppState, message: Option<&str>) -> Result<()> {
    let view = app.chat_view();

    let Some(text) = message else {
        notify(Action::Load, view.load().await)?;
        for message in view.messages() {
            print_chat_message(&message);
        }
        return Ok(());
    };

    match view.send(text).await {
        Ok(reply) => print_chat_message(&reply),
        Err(e @ CannonError::Validation(_)) => return notify(Action::SendMessage, Err(e)),
        Err(e) => {
            log_warn("💬", format!("chat request failed: {}", e));
            print_chat_message(&ChatMessage::assistant(CHAT_FAILURE_REPLY));
        }
    }
    Ok(())
}

async fn show_forums(app: &AppState) -> Result<()> {
    let forums = notify(Action::Load, app.api.get_forums().await)?;

    println!("Channels:");
    for forum in &forums.forums {
        let lock = if forum.is_admin_only { " [admin]" } else { "" };
        println!(
            "  • {}{} ({} messages)  id: {}",
            forum.name.bold(),
            lock.yellow(),
            forum.message_count,
            forum.id.dimmed()
        );
        if !forum.description.is_empty() {
            println!("      {}", forum.description);
        }
    }
    Ok(())
}

fn print_channel_message(message: &ChannelMessage) {
    let author = if message.is_admin {
        format!("{} [admin]", message.user_email).yellow().to_string()
    } else {
        message.user_email.bold().to_string()
    };
    println!(
        "{} {}: {}",
        message.created_at.format("%H:%M").to_string().dimmed(),
        author,
        message.content
    );
}

async fn show_channel(app: &AppState, channel_id: &str, watch: bool) -> Result<()> {
    let user = notify(Action::Load, app.api.current_user().await)?;
    let mut view = app.channel_view(channel_id, user.is_admin);

    if !watch {
        notify(Action::Load, view.load().await)?;
        println!("# {}", view.name().bold());
        for message in view.messages() {
            print_channel_message(&message);
        }
        return Ok(());
    }

    notify(Action::Load, view.open().await)?;
    println!("# {} (Ctrl-C to stop)", view.name().bold());

    let mut seen = HashSet::new();
    let interval = app.config.polling.channel_interval();
    loop {
        for message in view.messages() {
            if seen.insert(message.id.clone()) {
                print_channel_message(&message);
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    view.close();
    Ok(())
}

async fn post(app: &AppState, channel_id: &str, text: &str) -> Result<()> {
    let user = notify(Action::Load, app.api.current_user().await)?;
    let view = app.channel_view(channel_id, user.is_admin);
    notify(Action::Load, view.load().await)?;

    let message = notify(Action::SendMessage, view.post(text).await)?;
    print_channel_message(&message);
    Ok(())
}

async fn show_leaderboard(app: &AppState) -> Result<()> {
    let (board, me) = notify(
        Action::Load,
        futures::try_join!(app.api.get_leaderboard(), app.api.get_my_rank()),
    )?;

    println!("Leaderboard ({} users):", board.total_users);
    for entry in &board.entries {
        println!(
            "  {:>3}. {:<30} {:>5.1}  streak {}d",
            entry.rank, entry.user_email, entry.score, entry.streak_days
        );
    }

    println!();
    match me.rank {
        Some(rank) => println!("You are #{} of {}", rank.to_string().bold(), me.total_users),
        None => println!(
            "{}",
            me.message
                .as_deref()
                .unwrap_or("Complete a scan to join the leaderboard")
        ),
    }
    Ok(())
}

async fn show_profile(app: &AppState, limit: u32) -> Result<()> {
    let (history, me) = notify(
        Action::Load,
        futures::try_join!(app.api.get_scan_history(limit), app.api.get_my_rank()),
    )?;

    if let Some(email) = app.session.stored_email() {
        println!("{}", email.bold());
    }
    if let Some(rank) = me.rank {
        println!("  Rank: #{} of {}", rank, me.total_users);
    }
    if let Some(streak) = me.streak_days {
        println!("  Streak: {} days", streak);
    }
    if let Some(change) = me.improvement_percentage {
        println!("  Improvement: {:+.1}%", change);
    }

    println!();
    println!("Scan history:");
    if history.scans.is_empty() {
        println!("  No scans yet");
    }
    for scan in &history.scans {
        let score = scan
            .overall_score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string());
        println!("  • {}  {}", scan.created_at.format("%Y-%m-%d"), score);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockCannonApi;
    use crate::session::{CredentialStore, Session, StoredCredentials};
    use std::sync::Arc;
    use tokio::sync::watch;

    #[test]
    fn test_refusal_points_at_next_step() {
        let (_tx, rx) = watch::channel(Session {
            is_loading: false,
            is_authenticated: true,
            onboarding_completed: true,
            first_scan_completed: true,
            is_paid: false,
        });
        let router = GateRouter::new(rx);

        let err = enter_tab(&router, MainTab::Forums).unwrap_err();
        assert_eq!(err.to_string(), next_step(AccessState::Paywalled));
        assert!(enter(&router, Screen::Payment).is_ok());
    }

    #[test]
    fn test_notice_wraps_error() {
        let result: CannonResult<()> =
            Err(CannonError::Network("connection refused".to_string()));
        let err = notify(Action::Checkout, result).unwrap_err();
        assert_eq!(err.to_string(), "Error: Could not start checkout");
        assert!(err.downcast_ref::<CannonError>().is_some());
    }

    #[tokio::test]
    async fn test_status_fails_when_server_unreachable() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("session.toml"));
        store
            .save(&StoredCredentials {
                token: "tok-1".to_string(),
                email: Some("sam@example.com".to_string()),
            })
            .unwrap();

        let mut api = MockCannonApi::new();
        api.expect_set_token().returning(|_| ());
        api.expect_current_user()
            .times(1)
            .returning(|| Err(CannonError::Network("connection refused".to_string())));

        let mut config = Config::default();
        config.session.restore_attempts = 1;
        let app = AppState::with_parts(config, Arc::new(api), store.clone());

        let err = show_status(&app).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CannonError>(),
            Some(CannonError::RestoreFailed { attempts: 1, .. })
        ));
        assert!(store.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_read_image_guesses_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Left.PNG");
        std::fs::write(&path, [0x89u8, 0x50]).unwrap();

        let image = read_image(&path).await.unwrap();
        assert_eq!(image.file_name, "Left.PNG");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.data.len(), 2);

        assert!(read_image(&dir.path().join("missing.jpg")).await.is_err());
    }
}
