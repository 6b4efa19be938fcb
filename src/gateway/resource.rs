use serde::{Deserialize, Serialize};
use std::fmt;

/// Fleet entities managed through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Driver,
    Truck,
    Trailer,
    Load,
    TimeOff,
    User,
    /// Route suggestions produced for dispatcher review
    Route,
}

impl ResourceType {
    pub const COUNT: usize = 7;
    pub const ALL: [ResourceType; Self::COUNT] = [
        ResourceType::Driver,
        ResourceType::Truck,
        ResourceType::Trailer,
        ResourceType::Load,
        ResourceType::TimeOff,
        ResourceType::User,
        ResourceType::Route,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            ResourceType::Driver => "drivers",
            ResourceType::Truck => "trucks",
            ResourceType::Trailer => "trailers",
            ResourceType::Load => "loads",
            ResourceType::TimeOff => "time_off_requests",
            ResourceType::User => "users",
            ResourceType::Route => "routes",
        }
    }

    /// URL path segment under `/api`
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceType::Driver => "drivers",
            ResourceType::Truck => "trucks",
            ResourceType::Trailer => "trailers",
            ResourceType::Load => "loads",
            ResourceType::TimeOff => "time-off",
            ResourceType::User => "users",
            ResourceType::Route => "routes",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "time_off" | "timeoff" => Some(ResourceType::TimeOff),
            other => Self::ALL.into_iter().find(|r| r.segment() == other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Driver => "driver",
            ResourceType::Truck => "truck",
            ResourceType::Trailer => "trailer",
            ResourceType::Load => "load",
            ResourceType::TimeOff => "time-off request",
            ResourceType::User => "user",
            ResourceType::Route => "route suggestion",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
