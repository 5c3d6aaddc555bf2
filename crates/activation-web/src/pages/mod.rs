//! Page Components

mod home;
mod onboarding;

pub use home::HomePage;
pub use onboarding::OnboardingPage;
