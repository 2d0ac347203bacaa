//! Authorization check against a fixture.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tessera_abac::{AuthorizerOptions, Decision, DecisionSource, StalenessCoordinator};
use tessera_config::{ClockKind, TesseraConfig};
use tessera_store::{Clock, LogicalClock, MemoryStore, WallClock};
use tessera_types::{NegativeCacheMode, ResourceName, UserId};
use tracing::debug;

use super::fixture::Fixture;
use crate::style::colors::SemanticStyle;
use crate::style::{print_hint, print_labeled, print_section, print_spacer};

pub struct CheckArgs<'a> {
    pub fixture: &'a Path,
    pub user: &'a str,
    pub resource: &'a str,
    pub repeat: u32,
    pub negative_cache: Option<NegativeCacheMode>,
    pub json: bool,
}

/// Loads the fixture into a fresh in-memory store and asks the coordinator
/// `repeat` times, so the cached fast path shows up from the second answer on.
pub fn run(config: &TesseraConfig, args: &CheckArgs<'_>) -> Result<()> {
    let fixture = Fixture::load(args.fixture)?;

    let clock: Arc<dyn Clock> = match config.store.clock {
        ClockKind::Logical => Arc::new(LogicalClock::new()),
        ClockKind::Wall => Arc::new(WallClock::new()),
    };
    let store = Arc::new(MemoryStore::with_clock(clock));
    fixture
        .populate(&*store)
        .context("Failed to load fixture definitions")?;
    debug!(
        fixture = %args.fixture.display(),
        attributes = fixture.attributes.len(),
        users = fixture.users.len(),
        policies = fixture.policies.len(),
        resources = fixture.resources.len(),
        "Fixture loaded"
    );

    let options = AuthorizerOptions {
        negative_cache: args.negative_cache.unwrap_or(config.engine.negative_cache),
        audit: config.engine.audit,
    };
    let coordinator = StalenessCoordinator::new(store).with_options(options);

    let user = UserId::from(args.user);
    let resource = ResourceName::from(args.resource);

    if !args.json {
        print_section("Authorization Check");
        print_labeled("User", user.as_str());
        print_labeled("Resource", resource.as_str());
        print_labeled("Negative cache", options.negative_cache.as_str());
        print_spacer();
    }

    let mut last = None;
    for attempt in 1..=args.repeat.max(1) {
        let decision = coordinator
            .authorize(&user, &resource)
            .context("Authorization failed")?;

        if args.json {
            println!("{}", serde_json::to_string(&decision)?);
        } else {
            print_decision(attempt, &decision);
        }
        last = Some(decision);
    }

    if !args.json
        && let Some(decision) = last
        && !decision.allowed
    {
        print_spacer();
        print_hint("No policy bound to the resource is satisfied by this user");
    }

    Ok(())
}

fn print_decision(attempt: u32, decision: &Decision) {
    let verdict = match &decision.granting_policy {
        Some(policy) if decision.allowed => format!("granted by {policy}").success(),
        _ => "denied".error(),
    };
    let source = match decision.source {
        DecisionSource::CachedGrant => "cached grant",
        DecisionSource::CachedDenial => "cached denial",
        DecisionSource::Recomputed => "recomputed",
    };
    println!("  #{attempt} {verdict} {}", format!("({source})").muted());
}
