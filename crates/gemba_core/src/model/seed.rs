//! Built-in seed document.
//!
//! Used when no persisted state exists locally and when a remote slot is
//! found empty on first connect.

use crate::model::document::{Category, CategoryId, DashboardDocument, Topic, Update};

/// Returns the default dashboard content.
pub fn seed_document() -> DashboardDocument {
    DashboardDocument {
        rtb: Category {
            id: CategoryId::Rtb,
            title: "Running the Business".to_string(),
            topics: vec![
                topic(
                    "t1",
                    "Osiris",
                    vec![
                        update(
                            "u1",
                            "Inschrijfmodule Live",
                            "De nieuwe inschrijfmodule is succesvol live gegaan na de testfase.",
                        ),
                        update(
                            "u2",
                            "Database Optimalisatie",
                            "Performance optimalisatie database afgerond, laadtijden met 20% verbeterd.",
                        ),
                    ],
                ),
                topic("t2", "Studielink", vec![]),
                topic(
                    "t3",
                    "International Office",
                    vec![update(
                        "u3",
                        "Erasmus+ Q4",
                        "Alle Erasmus+ aanvragen zijn verwerkt voor het vierde kwartaal.",
                    )],
                ),
                topic("t4", "Functioneel Beheer Gilde", vec![]),
                topic("t5", "Managementinformatie", vec![]),
            ],
        },
        projects: Category {
            id: CategoryId::Projects,
            title: "Projecten".to_string(),
            topics: vec![
                topic(
                    "p1",
                    "Actuele projecten",
                    vec![update(
                        "u4",
                        "Cloud Migratie",
                        "Migratie naar Cloud omgeving gestart. Eerste servers zijn overgezet.",
                    )],
                ),
                topic("p2", "In beheer/nazorg", vec![]),
                topic("p3", "Toekomstig", vec![]),
            ],
        },
    }
}

fn topic(id: &str, title: &str, updates: Vec<Update>) -> Topic {
    Topic {
        id: id.to_string(),
        title: title.to_string(),
        updates,
    }
}

fn update(id: &str, title: &str, text: &str) -> Update {
    Update {
        id: id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
    }
}
