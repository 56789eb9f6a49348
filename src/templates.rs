use askama::Template;
use tracing::error;

pub struct Suggestion {
    pub emoji: &'static str,
    pub name: &'static str,
    pub query: &'static str,
}

const SUGGESTIONS: [Suggestion; 8] = [
    Suggestion { emoji: "🗽", name: "New York", query: "New York, USA" },
    Suggestion { emoji: "🏛️", name: "London", query: "London, GB" },
    Suggestion { emoji: "🗼", name: "Tokyo", query: "Tokyo, Japan" },
    Suggestion { emoji: "🥖", name: "Paris", query: "Paris, France" },
    Suggestion { emoji: "🏖️", name: "Sydney", query: "Sydney, Australia" },
    Suggestion { emoji: "🏔️", name: "Denver", query: "Denver, USA" },
    Suggestion { emoji: "🍁", name: "Toronto", query: "Toronto, Canada" },
    Suggestion { emoji: "🏜️", name: "Dubai", query: "Dubai, UAE" },
];

const HORIZONS: [u32; 4] = [24, 48, 72, 120];

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub default_location: String,
    pub suggestions: &'static [Suggestion],
    pub horizons: &'static [u32],
}

impl DashboardTemplate {
    pub fn page(default_location: &str) -> String {
        let template = DashboardTemplate {
            default_location: default_location.to_string(),
            suggestions: &SUGGESTIONS,
            horizons: &HORIZONS,
        };

        template.render().unwrap_or_else(|e| {
            error!("Template rendering error: {}", e);
            format!("Template error: {}", e)
        })
    }
}
