use chrono::NaiveDate;

use crate::models::ai_types::ArtifactKind;
use crate::models::insights::{DailyMetric, MetricsSnapshot, WeeklyMetrics};

const DEFAULT_USER_NAME: &str = "Productivity Tracker User";
const STREAK_CONTINUATION_THRESHOLD: u64 = 7;

/// Inputs rendered into the weekly report prompt.
#[derive(Debug, Clone)]
pub struct WeeklyReportPromptInput<'a> {
    pub user_name: Option<&'a str>,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub metrics: &'a WeeklyMetrics,
    pub active_habits: u32,
}

/// Closing instruction shared by every prompt.
pub fn output_directive(kind: ArtifactKind) -> String {
    format!(
        "Respond with ONLY a JSON object containing exactly these fields: {}.\n\
         Do not wrap the JSON in markdown code fences.\n\
         Do not add commentary before or after the JSON.",
        kind.fields().join(", ")
    )
}

/// Prompt for the weekly summary artifact.
pub fn weekly_summary_prompt(snapshot: &MetricsSnapshot) -> String {
    let top_habit = snapshot.top_habit_name.as_deref().unwrap_or("None");

    format!(
        r#"Generate a weekly productivity summary based on this data:
- Tasks completed: {tasks}
- Focus time: {minutes} minutes
- Top habit streak: {top_habit} ({streak} days)

Return JSON with schema:
{{
  "summary": "2-3 sentence overview of the week",
  "tasksCompleted": {tasks},
  "focusMinutes": {minutes},
  "topStreak": "habit name or 'No habits tracked'",
  "recommendation": "One specific actionable recommendation for next week"
}}

{directive}"#,
        tasks = snapshot.tasks_completed,
        minutes = snapshot.focus_minutes,
        streak = snapshot.top_habit_streak_days,
        directive = output_directive(ArtifactKind::WeeklySummary),
    )
}

/// Prompt for an actionable goal plan.
pub fn goal_plan_prompt(goal: &str, context: Option<&str>) -> String {
    format!(
        r#"Create an actionable plan for this goal: "{goal}"
{context}
Return JSON with schema:
{{
  "goal": "{goal}",
  "steps": ["step 1", "step 2", "step 3", "step 4"],
  "timeline": "Realistic timeline estimate",
  "focus": "Primary focus area or metric to track"
}}

Provide 4-6 specific, actionable steps.

{directive}"#,
        context = context_line(context),
        directive = output_directive(ArtifactKind::GoalPlan),
    )
}

/// Prompt for improving a single habit.
pub fn habit_optimization_prompt(habit_name: &str, current_streak: u64, context: Option<&str>) -> String {
    let phase = if current_streak > STREAK_CONTINUATION_THRESHOLD {
        "continuation"
    } else {
        "building"
    };

    format!(
        r#"Optimize this habit: "{habit_name}" with {current_streak} day streak.
{context}
Return JSON with schema:
{{
  "habit": "{habit_name}",
  "currentStreak": {current_streak},
  "suggestion": "Specific suggestion to improve the habit",
  "motivation": "Motivational insight for streak {phase}",
  "nextStep": "Next concrete action to take today"
}}

{directive}"#,
        context = context_line(context),
        directive = output_directive(ArtifactKind::HabitOptimization),
    )
}

/// One line per day: `"{date}: {tasks} tasks, {habits} habits, {minutes}min focus, {score}/100 score"`.
pub fn daily_breakdown_block(days: &[DailyMetric]) -> String {
    days.iter()
        .map(|day| {
            format!(
                "{}: {} tasks, {} habits, {}min focus, {}/100 score",
                day.date.format("%Y-%m-%d"),
                day.tasks_completed,
                day.habits_completed,
                day.focus_minutes,
                day.productivity_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the persisted weekly report.
pub fn weekly_report_prompt(input: &WeeklyReportPromptInput<'_>) -> String {
    let metrics = input.metrics;
    let user_name = input
        .user_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_USER_NAME);

    format!(
        r#"Based on the following weekly productivity data, generate a professional AI-powered productivity report.

User: {user_name}
Week: {start} to {end}

Weekly Statistics:
- Tasks Completed: {tasks}
- Habits Completed: {habits}
- Total Focus Hours: {hours:.1}
- Average Productivity Score: {score}/100
- Number of Active Habits: {active}

Daily Breakdown:
{breakdown}

Please provide a structured AI analysis in the following JSON format:
{{
  "summary": "A brief 2-3 sentence overall summary of the week's productivity",
  "strengths": ["strength1", "strength2", "strength3"],
  "improvements": ["area_to_improve_1", "area_to_improve_2", "area_to_improve_3"],
  "suggestions": ["actionable_suggestion_1", "actionable_suggestion_2", "actionable_suggestion_3"]
}}

{directive}"#,
        start = input.week_start.format("%Y-%m-%d"),
        end = input.week_end.format("%Y-%m-%d"),
        tasks = metrics.tasks_completed,
        habits = metrics.habits_completed,
        hours = round_half_up(metrics.total_focus_hours()),
        score = metrics.avg_productivity_score.round() as i64,
        active = input.active_habits,
        breakdown = daily_breakdown_block(&metrics.daily_breakdown),
        directive = output_directive(ArtifactKind::WeeklyReport),
    )
}

// `{:.1}` rounds ties to even; report hours round half up (3.25 -> 3.3).
fn round_half_up(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn context_line(context: Option<&str>) -> String {
    match context.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => format!("Context: {value}\n"),
        None => String::new(),
    }
}
