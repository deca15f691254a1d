//! Access gate: decides whether a view renders, redirects, or is denied.
//!
//! Checked in order on every navigation:
//! 1. No token → redirect to login.
//! 2. Patient missing age or sex → redirect to onboarding (unless already
//!    there). Overrides the role check.
//! 3. Role outside the allow-list → access denied. Not a redirect.
//! 4. Otherwise render.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Profile, Role};
use crate::session::{SessionSignal, SessionSnapshot, SessionStore};

// ═══════════════════════════════════════════════════════════
// Routes
// ═══════════════════════════════════════════════════════════

const PATIENT_ROLES: &[Role] = &[Role::Patient];
const DOCTOR_ROLES: &[Role] = &[Role::Doctor, Role::Admin];

/// Navigation targets of the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Onboarding,
    History,
    Uploads,
    NewChat,
    ChatHistory,
    Chat(String),
    Reports,
    Report(String),
    DoctorDashboard,
    DoctorReports,
    DoctorReport(String),
    DoctorApproved,
    DoctorSearch,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown route: {0}")]
pub struct RouteParseError(pub String);

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Onboarding => "/onboarding".to_string(),
            Self::History => "/history".to_string(),
            Self::Uploads => "/uploads".to_string(),
            Self::NewChat => "/chat/new".to_string(),
            Self::ChatHistory => "/chat/history".to_string(),
            Self::Chat(id) => format!("/chat/{id}"),
            Self::Reports => "/reports".to_string(),
            Self::Report(id) => format!("/reports/{id}"),
            Self::DoctorDashboard => "/doctor/dashboard".to_string(),
            Self::DoctorReports => "/doctor/reports".to_string(),
            Self::DoctorReport(id) => format!("/doctor/reports/{id}"),
            Self::DoctorApproved => "/doctor/approved".to_string(),
            Self::DoctorSearch => "/doctor/search".to_string(),
        }
    }

    /// Whether the route needs a signed-in user at all.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Home | Self::Login)
    }

    /// Role allow-list of the route. `None` means any signed-in user.
    pub fn required_roles(&self) -> Option<&'static [Role]> {
        match self {
            Self::Home | Self::Login | Self::Onboarding => None,
            Self::History
            | Self::Uploads
            | Self::NewChat
            | Self::ChatHistory
            | Self::Chat(_)
            | Self::Reports
            | Self::Report(_) => Some(PATIENT_ROLES),
            Self::DoctorDashboard
            | Self::DoctorReports
            | Self::DoctorReport(_)
            | Self::DoctorApproved
            | Self::DoctorSearch => Some(DOCTOR_ROLES),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

impl std::str::FromStr for Route {
    type Err = RouteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.split(['?', '#']).next().unwrap_or_default();
        if !path.starts_with('/') {
            return Err(RouteParseError(s.to_string()));
        }
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        let route = match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["onboarding"] => Self::Onboarding,
            ["history"] => Self::History,
            ["uploads"] => Self::Uploads,
            ["chat", "new"] => Self::NewChat,
            ["chat", "history"] => Self::ChatHistory,
            ["chat", id] if !id.is_empty() => Self::Chat(id.to_string()),
            ["reports"] => Self::Reports,
            ["reports", id] if !id.is_empty() => Self::Report(id.to_string()),
            ["doctor", "dashboard"] => Self::DoctorDashboard,
            ["doctor", "reports"] => Self::DoctorReports,
            ["doctor", "reports", id] if !id.is_empty() => Self::DoctorReport(id.to_string()),
            ["doctor", "approved"] => Self::DoctorApproved,
            ["doctor", "search"] => Self::DoctorSearch,
            _ => return Err(RouteParseError(s.to_string())),
        };
        Ok(route)
    }
}

// ═══════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    /// Navigate away, replacing the current history entry. Render nothing.
    Redirect(Route),
    /// Render the terminal "access denied" view.
    Denied,
}

/// Pure access decision for `current`, guarded by `allowed` roles.
pub fn evaluate(session: &SessionSnapshot, current: &Route, allowed: Option<&[Role]>) -> GateDecision {
    if !session.authenticated {
        return GateDecision::Redirect(Route::Login);
    }

    if needs_onboarding(session, current) {
        return GateDecision::Redirect(Route::Onboarding);
    }

    let profile = session.profile.as_ref();

    if let Some(roles) = allowed {
        if !can_access(profile, roles) {
            return GateDecision::Denied;
        }
    }

    GateDecision::Render
}

/// Signed-in patient missing demographics, anywhere but onboarding.
fn needs_onboarding(session: &SessionSnapshot, current: &Route) -> bool {
    session.authenticated
        && *current != Route::Onboarding
        && session.profile.as_ref().is_some_and(Profile::is_incomplete)
}

// ═══════════════════════════════════════════════════════════
// RBAC helpers
// ═══════════════════════════════════════════════════════════

/// True when a profile exists and its role is in `roles`.
pub fn can_access(profile: Option<&Profile>, roles: &[Role]) -> bool {
    profile.is_some_and(|p| roles.contains(&p.role))
}

pub fn can_access_patient_routes(profile: Option<&Profile>) -> bool {
    can_access(profile, PATIENT_ROLES)
}

pub fn can_access_doctor_routes(profile: Option<&Profile>) -> bool {
    can_access(profile, DOCTOR_ROLES)
}

pub fn is_admin(profile: Option<&Profile>) -> bool {
    can_access(profile, &[Role::Admin])
}

/// Where to go after login or onboarding.
pub fn landing_route(profile: &Profile) -> Route {
    match profile.role {
        Role::Doctor | Role::Admin => Route::DoctorDashboard,
        Role::Patient if profile.is_incomplete() => Route::Onboarding,
        Role::Patient => Route::Home,
    }
}

// ═══════════════════════════════════════════════════════════
// AccessGate
// ═══════════════════════════════════════════════════════════

/// Gate bound to a session store. Every check reads the store afresh.
#[derive(Clone)]
pub struct AccessGate {
    session: Arc<SessionStore>,
}

impl AccessGate {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decision for navigating to `route`, using the route's own
    /// allow-list. Public routes skip the login and role checks but an
    /// incomplete patient is still sent to onboarding from them.
    pub fn check(&self, route: &Route) -> GateDecision {
        if !route.is_protected() {
            if needs_onboarding(&self.session.snapshot(), route) {
                tracing::debug!(route = %route, "Incomplete profile, redirecting to onboarding");
                return GateDecision::Redirect(Route::Onboarding);
            }
            return GateDecision::Render;
        }
        self.check_with(route, route.required_roles())
    }

    /// Decision for a view guarded by an explicit allow-list.
    pub fn check_with(&self, route: &Route, allowed: Option<&[Role]>) -> GateDecision {
        let decision = evaluate(&self.session.snapshot(), route, allowed);
        if decision != GateDecision::Render {
            tracing::debug!(route = %route, ?decision, "Access gate blocked view");
        }
        decision
    }

    /// Session change signals. A view re-runs `check` when this fires.
    pub fn watch(&self) -> watch::Receiver<SessionSignal> {
        self.session.subscribe()
    }
}
