use kudos_api::endpoints::students::Student;
use serde::Serialize;

pub const PAGE_SIZE: usize = 5;
pub const POINTS_PER_LEVEL: u32 = 50;

/// Filters and ordering for the student leaderboard.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardQuery {
    /// Case-insensitive substring of the department name.
    pub department: Option<String>,
    /// Case-insensitive substring of the group name.
    pub group: Option<String>,
    pub ascending: bool,
    /// 1-based; clamped into range.
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub name: String,
    pub department: Option<String>,
    pub group: Option<String>,
    pub points: u32,
    pub level_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardPage {
    pub entries: Vec<Standing>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Percent of the way from the current level to the next.
pub fn level_progress(points: u32) -> f64 {
    f64::from(points % POINTS_PER_LEVEL) * 100.0 / f64::from(POINTS_PER_LEVEL)
}

/// Number of pages needed for `total` entries; an empty board still has one page.
pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE).max(1)
}

/// Clamp a requested 1-based page number into `1..=total_pages`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

fn matches_filter(value: Option<&str>, filter: Option<&str>) -> bool {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return true;
    };
    value.is_some_and(|value| value.to_lowercase().contains(&filter.to_lowercase()))
}

pub fn leaderboard(students: &[Student], query: &LeaderboardQuery) -> LeaderboardPage {
    let mut ranked: Vec<&Student> = students
        .iter()
        .filter(|s| matches_filter(s.department(), query.department.as_deref()))
        .filter(|s| matches_filter(s.group(), query.group.as_deref()))
        .collect();

    // Stable, so students with equal points keep the backend's order
    if query.ascending {
        ranked.sort_by_key(|s| s.points());
    } else {
        ranked.sort_by_key(|s| std::cmp::Reverse(s.points()));
    }

    let total = ranked.len();
    let total_pages = page_count(total);
    let page = clamp_page(query.page, total_pages);
    let offset = (page - 1) * PAGE_SIZE;

    let entries = ranked
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(PAGE_SIZE)
        .map(|(index, student)| Standing {
            rank: index + 1,
            name: student.full_name(),
            department: student.department().map(str::to_owned),
            group: student.group().map(str::to_owned),
            points: student.points(),
            level_progress: level_progress(student.points()),
        })
        .collect();

    LeaderboardPage {
        entries,
        page,
        total_pages,
        total,
    }
}
