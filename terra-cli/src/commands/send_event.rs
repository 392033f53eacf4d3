//! `terra send-event`: publish one event and report what ran.

use colored::Colorize;
use terra_events::{DispatchReport, Event, InstanceRef, UserRef};

use crate::error::{CliError, CliResult};
use crate::kwargs;
use crate::runtime::Runtime;

/// Event fields as given on the command line.
#[derive(Debug, Default)]
pub struct EventArgs {
    pub action: Option<String>,
    pub sender: Option<String>,
    pub instance: Option<String>,
    pub user: Option<String>,
    pub kwargs: Vec<String>,
}

/// Build the event. `action`, `sender`, `instance` and `user` may also be
/// given as kwargs; explicit flags win.
pub fn build_event(args: EventArgs) -> CliResult<Event> {
    let mut extra = kwargs::parse_all(&args.kwargs)?;

    let mut field = |flag: Option<String>, key: &str| {
        let from_kwargs = kwargs::take(&mut extra, key);
        flag.or(from_kwargs)
    };
    let action = field(args.action, "action");
    let sender = field(args.sender, "sender");
    let instance = field(args.instance, "instance");
    let user = field(args.user, "user");

    let action = action
        .filter(|a| !a.trim().is_empty())
        .ok_or(CliError::MissingArgument("action"))?;

    let mut event = Event::new(action).sender(sender.unwrap_or_else(|| "terra-cli".to_string()));
    if let Some(instance) = instance {
        let Ok(instance) = instance.parse::<InstanceRef>();
        event = event.instance(instance);
    }
    if let Some(user) = user {
        let Ok(user) = user.parse::<UserRef>();
        event = event.user(user);
    }
    event.extra = extra;

    Ok(event)
}

pub async fn execute(runtime: &Runtime, args: EventArgs, json: bool, quiet: bool) -> CliResult<()> {
    let event = build_event(args)?;
    let report = runtime.bus.send(event).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::Dispatch(e.to_string()))?;
        println!("{}", rendered);
    } else if !quiet {
        print_report(&report);
    }

    if let Some(outbox) = &runtime.outbox
        && !quiet
        && !json
    {
        println!("  {} {} message(s) captured", "✉".cyan(), outbox.len());
    }

    Ok(())
}

fn print_report(report: &DispatchReport) {
    println!(
        "{} {} {}",
        "Dispatched".green().bold(),
        report.action.bold(),
        format!("({})", report.event_id).dimmed()
    );

    if report.total() == 0 {
        println!("  {}", "no handlers configured for this action".dimmed());
        return;
    }

    for handler in &report.executed {
        println!("  {} {}", "executed  ".green(), handler);
    }
    for handler in &report.skipped {
        println!("  {} {}", "skipped   ".yellow(), handler);
    }
    for handler in &report.unresolved {
        println!("  {} {}", "unresolved".red(), handler);
    }
    for failure in &report.failed {
        println!("  {} {}: {}", "failed    ".red().bold(), failure.handler, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(action: Option<&str>, kwargs: &[&str]) -> EventArgs {
        EventArgs {
            action: action.map(String::from),
            kwargs: kwargs.iter().map(|s| s.to_string()).collect(),
            ..EventArgs::default()
        }
    }

    #[test]
    fn test_action_from_flag_or_kwargs() {
        let event = build_event(args(Some("FAKE"), &["foo:bar"])).unwrap();
        assert_eq!(event.action, "FAKE");
        assert_eq!(event.extra["foo"], "bar");

        let event = build_event(args(None, &["action:FAKE", "foo:bar"])).unwrap();
        assert_eq!(event.action, "FAKE");
        assert!(!event.extra.contains_key("action"));
    }

    #[test]
    fn test_flag_wins_over_kwargs() {
        let event = build_event(args(Some("REAL"), &["action:OTHER"])).unwrap();
        assert_eq!(event.action, "REAL");
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_missing_action() {
        assert!(matches!(
            build_event(args(None, &["foo:bar"])),
            Err(CliError::MissingArgument("action"))
        ));
    }

    #[test]
    fn test_malformed_kwargs() {
        assert!(matches!(
            build_event(args(Some("FAKE"), &["lorem:ipsum:dolor"])),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_instance_and_user() {
        let event = build_event(EventArgs {
            action: Some("APPROVED".into()),
            kwargs: vec!["instance:7".into(), "user:ada@example.com".into()],
            ..EventArgs::default()
        })
        .unwrap();

        assert_eq!(event.instance, Some(InstanceRef::id("7")));
        assert_eq!(
            event.user.and_then(|u| u.email).as_deref(),
            Some("ada@example.com")
        );
        assert_eq!(event.sender, "terra-cli");
    }
}
