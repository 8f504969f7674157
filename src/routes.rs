//! Screen navigation. Routes are a closed enum, so dispatch is exhaustive
//! and "unknown route" can only happen at the string edge (CLI/history),
//! where it falls back to Home. Access control lives in a guard table;
//! guards return a verdict instead of redirecting behind the router's back,
//! which bounds every navigation to a fixed number of guard evaluations.

use std::collections::HashMap;

use log::error;

/// Redirect chains longer than this mount the error screen instead of
/// looping.
pub const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Recipients,
    Campaigns,
    MarketingEmail,
    TransactionalEmail,
    AiGenerator,
    EmailLogs,
    /// Generic failure screen; reachable only by failing closed, never by
    /// parsing a path.
    Error,
}

impl Route {
    /// Resolve a path string. Accepts paths with or without the leading
    /// slash; unknown paths return `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.trim();
        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        match normalized.as_str() {
            "/" | "/home" => Some(Route::Home),
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/dashboard" => Some(Route::Dashboard),
            "/recipients" => Some(Route::Recipients),
            "/campaigns" => Some(Route::Campaigns),
            "/marketing-email" => Some(Route::MarketingEmail),
            "/transactional-email" => Some(Route::TransactionalEmail),
            "/ai-generator" => Some(Route::AiGenerator),
            "/email-logs" => Some(Route::EmailLogs),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Recipients => "/recipients",
            Route::Campaigns => "/campaigns",
            Route::MarketingEmail => "/marketing-email",
            Route::TransactionalEmail => "/transactional-email",
            Route::AiGenerator => "/ai-generator",
            Route::EmailLogs => "/email-logs",
            Route::Error => "/error",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Dashboard => "Dashboard",
            Route::Recipients => "Recipients",
            Route::Campaigns => "Campaigns",
            Route::MarketingEmail => "Marketing Email",
            Route::TransactionalEmail => "Transactional Email",
            Route::AiGenerator => "AI Generator",
            Route::EmailLogs => "Email Logs",
            Route::Error => "Error",
        }
    }
}

/// What a navigation needs to know about the world. Built fresh for each
/// call so guards never read ambient state.
#[derive(Debug, Clone, Copy)]
pub struct NavContext {
    pub authenticated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Redirect(Route),
    Deny,
}

pub type GuardFn = fn(&NavContext) -> Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Mounted(Route),
    Denied,
}

fn require_auth(ctx: &NavContext) -> Verdict {
    if ctx.authenticated {
        Verdict::Allow
    } else {
        Verdict::Redirect(Route::Login)
    }
}

fn guests_only(ctx: &NavContext) -> Verdict {
    if ctx.authenticated {
        Verdict::Redirect(Route::Dashboard)
    } else {
        Verdict::Allow
    }
}

fn home_entry(ctx: &NavContext) -> Verdict {
    if ctx.authenticated {
        Verdict::Redirect(Route::Dashboard)
    } else {
        Verdict::Redirect(Route::Login)
    }
}

pub struct Router {
    guards: HashMap<Route, GuardFn>,
    current: Route,
    history: Vec<Route>,
}

impl Router {
    /// Router with an explicit guard table; `navigate` must run before the
    /// first render to apply the Home guard.
    pub fn new(guards: HashMap<Route, GuardFn>) -> Self {
        Self {
            guards,
            current: Route::Home,
            history: Vec::new(),
        }
    }

    /// The application's guard table: Home dispatches by auth state, the
    /// auth pages reject logged-in users, everything else requires a
    /// session.
    pub fn with_default_guards() -> Self {
        let mut guards: HashMap<Route, GuardFn> = HashMap::new();
        guards.insert(Route::Home, home_entry);
        guards.insert(Route::Login, guests_only);
        guards.insert(Route::Register, guests_only);
        guards.insert(Route::Dashboard, require_auth);
        guards.insert(Route::Recipients, require_auth);
        guards.insert(Route::Campaigns, require_auth);
        guards.insert(Route::MarketingEmail, require_auth);
        guards.insert(Route::TransactionalEmail, require_auth);
        guards.insert(Route::AiGenerator, require_auth);
        guards.insert(Route::EmailLogs, require_auth);
        Self::new(guards)
    }

    pub fn current(&self) -> Route {
        self.current
    }

    /// Mounted route history, most recent last. The string paths are what
    /// the log output shows.
    pub fn history(&self) -> &[Route] {
        &self.history
    }

    /// Navigate by path string. Unknown paths fall back to Home.
    pub fn navigate(&mut self, path: &str, ctx: &NavContext) -> NavOutcome {
        let route = Route::parse(path).unwrap_or_else(|| {
            error!("Route not found: {}", path);
            Route::Home
        });
        self.navigate_route(route, ctx)
    }

    /// Navigate to a known route, following guard redirects up to
    /// `MAX_REDIRECTS`. Past the cap the router fails closed and mounts the
    /// error screen. A `Deny` verdict leaves the mounted route and history
    /// untouched.
    pub fn navigate_route(&mut self, route: Route, ctx: &NavContext) -> NavOutcome {
        let mut target = route;

        for _ in 0..=MAX_REDIRECTS {
            match self.guards.get(&target).map_or(Verdict::Allow, |g| g(ctx)) {
                Verdict::Allow => {
                    self.mount(target, true);
                    return NavOutcome::Mounted(target);
                }
                Verdict::Deny => return NavOutcome::Denied,
                Verdict::Redirect(next) => target = next,
            }
        }

        error!(
            "Redirect chain from {} exceeded {} hops; mounting error screen",
            route.path(),
            MAX_REDIRECTS
        );
        self.mount(Route::Error, true);
        NavOutcome::Mounted(Route::Error)
    }

    /// Return to the previously mounted route, bypassing guards: whatever
    /// was mounted before already passed them. Remounts without pushing,
    /// like a history-driven re-entry.
    pub fn back(&mut self, _ctx: &NavContext) -> Option<Route> {
        // Top of the stack is the current route; keep the root mounted.
        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        let previous = *self.history.last()?;
        self.mount(previous, false);
        Some(previous)
    }

    /// Mount the generic error screen, replacing the current view. Used when
    /// a screen's post-mount data load fails.
    pub fn fail(&mut self) {
        self.mount(Route::Error, true);
    }

    fn mount(&mut self, route: Route, push: bool) {
        self.current = route;
        if push && self.history.last() != Some(&route) {
            self.history.push(route);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anon() -> NavContext {
        NavContext {
            authenticated: false,
        }
    }

    fn logged_in() -> NavContext {
        NavContext {
            authenticated: true,
        }
    }

    #[test]
    fn parse_known_paths_roundtrip() {
        for route in [
            Route::Login,
            Route::Register,
            Route::Dashboard,
            Route::Recipients,
            Route::Campaigns,
            Route::MarketingEmail,
            Route::TransactionalEmail,
            Route::AiGenerator,
            Route::EmailLogs,
        ] {
            assert_eq!(Route::parse(route.path()), Some(route));
        }
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("home"), Some(Route::Home));
    }

    #[test]
    fn error_route_never_parses() {
        assert_eq!(Route::parse("/error"), None);
    }

    #[test]
    fn unknown_path_falls_back_to_home() {
        let mut router = Router::new(HashMap::new());
        let outcome = router.navigate("/no-such-page", &anon());
        assert_eq!(outcome, NavOutcome::Mounted(Route::Home));
    }

    #[test]
    fn mounts_exactly_the_requested_route_when_unguarded() {
        let mut router = Router::new(HashMap::new());
        for route in [Route::Login, Route::Dashboard, Route::Campaigns] {
            let outcome = router.navigate(route.path(), &anon());
            assert_eq!(outcome, NavOutcome::Mounted(route));
            assert_eq!(router.current(), route);
        }
    }

    #[test]
    fn unauthenticated_dashboard_redirects_to_login() {
        let mut router = Router::with_default_guards();
        let outcome = router.navigate("/dashboard", &anon());

        assert_eq!(outcome, NavOutcome::Mounted(Route::Login));
        assert_eq!(router.current(), Route::Login);
        // The history (the hash analog) records the login page, not the
        // page that was refused.
        assert_eq!(router.history(), &[Route::Login]);
    }

    #[test]
    fn authenticated_login_settles_on_dashboard_once() {
        let mut router = Router::with_default_guards();
        let outcome = router.navigate("/login", &logged_in());

        assert_eq!(outcome, NavOutcome::Mounted(Route::Dashboard));
        assert_eq!(router.history(), &[Route::Dashboard]);
    }

    #[test]
    fn home_dispatches_by_auth_state() {
        let mut router = Router::with_default_guards();
        assert_eq!(
            router.navigate("/", &anon()),
            NavOutcome::Mounted(Route::Login)
        );
        assert_eq!(
            router.navigate("/", &logged_in()),
            NavOutcome::Mounted(Route::Dashboard)
        );
    }

    #[test]
    fn deny_changes_nothing() {
        fn deny_all(_: &NavContext) -> Verdict {
            Verdict::Deny
        }

        let mut guards: HashMap<Route, GuardFn> = HashMap::new();
        guards.insert(Route::Campaigns, deny_all);
        let mut router = Router::new(guards);

        router.navigate("/dashboard", &anon());
        let before = router.history().to_vec();

        assert_eq!(router.navigate("/campaigns", &anon()), NavOutcome::Denied);
        assert_eq!(router.current(), Route::Dashboard);
        assert_eq!(router.history(), before.as_slice());
    }

    #[test]
    fn guard_cycle_fails_closed_on_error_screen() {
        fn ping(_: &NavContext) -> Verdict {
            Verdict::Redirect(Route::Register)
        }
        fn pong(_: &NavContext) -> Verdict {
            Verdict::Redirect(Route::Login)
        }

        let mut guards: HashMap<Route, GuardFn> = HashMap::new();
        guards.insert(Route::Login, ping);
        guards.insert(Route::Register, pong);
        let mut router = Router::new(guards);

        let outcome = router.navigate("/login", &anon());
        assert_eq!(outcome, NavOutcome::Mounted(Route::Error));
        assert_eq!(router.current(), Route::Error);
    }

    #[test]
    fn back_remounts_previous_without_pushing() {
        let mut router = Router::with_default_guards();
        let ctx = logged_in();

        router.navigate("/dashboard", &ctx);
        router.navigate("/recipients", &ctx);
        router.navigate("/campaigns", &ctx);

        assert_eq!(router.back(&ctx), Some(Route::Recipients));
        assert_eq!(router.current(), Route::Recipients);
        assert_eq!(router.history(), &[Route::Dashboard, Route::Recipients]);

        assert_eq!(router.back(&ctx), Some(Route::Dashboard));
        // Nothing earlier than the first mount.
        assert_eq!(router.back(&ctx), None);
    }

    #[test]
    fn repeated_navigation_does_not_duplicate_history() {
        let mut router = Router::with_default_guards();
        let ctx = logged_in();

        router.navigate("/dashboard", &ctx);
        router.navigate("/dashboard", &ctx);
        assert_eq!(router.history(), &[Route::Dashboard]);
    }
}
