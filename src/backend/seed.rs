use crate::model::Worksheet;
use chrono::{DateTime, Utc};

fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().unwrap_or_default()
}

fn topics(items: &[&str]) -> Vec<String> {
    items.iter().map(|t| t.to_string()).collect()
}

/// Example catalog a fresh demo store starts with.
pub(crate) fn worksheets() -> Vec<Worksheet> {
    vec![
        Worksheet {
            id: "worksheet-1".into(),
            title: "SAT Math Practice – Algebra Essentials".into(),
            description: "Brush up on linear equations, inequalities, and systems of equations with this targeted SAT practice set.".into(),
            category: "SAT Math".into(),
            difficulty: "Intermediate".into(),
            file_url: "https://files.publicreadingroom.com/math-worksheets/sample-sat-algebra.pdf".into(),
            preview_image_url: Some(
                "https://images.unsplash.com/photo-1523240795612-9a054b0db644?w=800&q=80".into(),
            ),
            download_count: 42,
            topics: topics(&["Linear Equations", "Systems", "Inequalities"]),
            pages: Some(6),
            created_date: at("2024-02-10T09:00:00Z"),
        },
        Worksheet {
            id: "worksheet-2".into(),
            title: "Geometry Fundamentals – Angles and Triangles".into(),
            description: "A printable pack that covers complementary angles, triangle sums, and classifying triangles.".into(),
            category: "Geometry".into(),
            difficulty: "Beginner".into(),
            file_url: "https://files.publicreadingroom.com/math-worksheets/sample-geometry.pdf".into(),
            preview_image_url: Some(
                "https://images.unsplash.com/photo-1509228468518-180dd4864904?w=800&q=80".into(),
            ),
            download_count: 18,
            topics: topics(&["Angle Relationships", "Triangles"]),
            pages: Some(4),
            created_date: at("2024-03-04T12:00:00Z"),
        },
        Worksheet {
            id: "worksheet-3".into(),
            title: "Advanced Calculus – Derivatives Drill".into(),
            description: "Challenge yourself with derivative problems involving product, quotient, and chain rules.".into(),
            category: "Calculus".into(),
            difficulty: "Advanced".into(),
            file_url: "https://files.publicreadingroom.com/math-worksheets/sample-calculus.pdf".into(),
            preview_image_url: Some(
                "https://images.unsplash.com/photo-1523580846011-d3a5bc25702b?w=800&q=80".into(),
            ),
            download_count: 7,
            topics: topics(&["Derivative Rules", "Chain Rule"]),
            pages: Some(5),
            created_date: at("2024-01-28T15:00:00Z"),
        },
    ]
}
