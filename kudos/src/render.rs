//! Table rendering for command output.

use comfy_table::{ContentArrangement, Table};
use kudos_api::endpoints::awards::AwardType;
use kudos_api::endpoints::departments::Group;
use kudos_api::endpoints::events::Event;
use kudos_api::endpoints::profile::Profile;
use kudos_api::endpoints::students::Student;
use kudos_api::endpoints::teachers::Teacher;
use kudos_api::endpoints::{Named, Reference};

use crate::leaderboard::LeaderboardPage;

const MISSING: &str = "-";

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn or_missing(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(MISSING)
        .to_string()
}

/// Event time as `dd.mm.yyyy hh:mm`, or the raw value when it does not parse.
pub fn event_time(event: &Event) -> String {
    match event.starts_at() {
        Some(starts_at) => starts_at.format("%d.%m.%Y %H:%M").to_string(),
        None => or_missing(Some(&event.date_time)),
    }
}

pub fn events_table(events: &[Event]) -> Table {
    let mut table = table(&["Date", "Title", "Kind", "Teacher", "Students", "Level"]);
    for event in events {
        table.add_row(vec![
            event_time(event),
            event.title.clone(),
            event
                .icon_type
                .map(|kind| format!("{kind:?}").to_lowercase())
                .unwrap_or_else(|| MISSING.to_string()),
            event
                .teacher
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| MISSING.to_string()),
            event.students.len().to_string(),
            or_missing(event.level.as_deref()),
        ]);
    }
    table
}

pub fn leaderboard_table(page: &LeaderboardPage) -> Table {
    let mut table = table(&["#", "Student", "Department", "Group", "Points", "Next level"]);
    for entry in &page.entries {
        table.add_row(vec![
            entry.rank.to_string(),
            entry.name.clone(),
            or_missing(entry.department.as_deref()),
            or_missing(entry.group.as_deref()),
            entry.points.to_string(),
            format!("{:.0}%", entry.level_progress),
        ]);
    }
    table
}

pub fn students_table(students: &[Student], show_email: bool) -> Table {
    let mut header = vec!["Name", "Department", "Group", "Points", "Level"];
    if show_email {
        header.push("Email");
    }
    let mut table = table(&header);

    for student in students {
        let mut row = vec![
            student.full_name(),
            student.department().unwrap_or(MISSING).to_string(),
            student.group().unwrap_or(MISSING).to_string(),
            student.points().to_string(),
            student
                .level
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| MISSING.to_string()),
        ];
        if show_email {
            row.push(student.email.clone().unwrap_or_default());
        }
        table.add_row(row);
    }
    table
}

pub fn teachers_table(teachers: &[Teacher]) -> Table {
    let mut table = table(&["Name", "Position", "Email"]);
    for teacher in teachers {
        table.add_row(vec![
            teacher.full_name(),
            teacher.position.clone(),
            teacher.email.clone(),
        ]);
    }
    table
}

/// Departments, award types and other id/name lookups.
pub fn named_table(entries: &[Named]) -> Table {
    let mut table = table(&["Id", "Name"]);
    for entry in entries {
        table.add_row(vec![entry.id.to_string(), entry.name.clone()]);
    }
    table
}

pub fn groups_table(groups: &[Group]) -> Table {
    let mut table = table(&["Id", "Name"]);
    for group in groups {
        table.add_row(vec![group.id.to_string(), group.name.clone()]);
    }
    table
}

pub fn award_types_table(types: &[AwardType]) -> Table {
    let mut table = table(&["Award type", "Degrees"]);
    for award_type in types {
        let degrees = kudos_api::endpoints::awards::allowed_degrees(&award_type.name)
            .map(|degrees| degrees.join(", "))
            .unwrap_or_else(|| MISSING.to_string());
        table.add_row(vec![award_type.name.clone(), degrees]);
    }
    table
}

fn reference_label(reference: Option<&Reference>) -> String {
    match reference {
        Some(reference) => reference
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| reference.id().to_string()),
        None => MISSING.to_string(),
    }
}

pub fn profile_table(profile: &Profile, base_url: &str) -> Table {
    let mut table = table(&["Field", "Value"]);
    let rows = [
        ("Name", profile.full_name()),
        ("Login", or_missing(profile.login.as_deref())),
        ("Email", or_missing(profile.email.as_deref())),
        ("Birth date", or_missing(profile.birth_date.as_deref())),
        ("Department", reference_label(profile.department_id.as_ref())),
        ("Group", reference_label(profile.group_id.as_ref())),
        (
            "Admission year",
            profile
                .admission_year
                .map(|year| year.to_string())
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        (
            "Points",
            profile.points.unwrap_or_default().to_string(),
        ),
        ("Avatar", or_missing(profile.avatar_url(base_url).as_deref())),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }
    table
}
