//! Typed field extraction from a rendered match page.
//!
//! Every function here is a pure query over a [`PageSource`]: missing
//! elements yield `None` or empty collections, never an iteration
//! failure. The structured shapes are deserialized from in-page
//! JavaScript evaluation because the score and odds blocks are laid out
//! as nested elements that are awkward to reassemble from flat selector
//! queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use wicketwatch_browser::{PageSource, Result};

/// Score block for the batting team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    pub team_name: String,
    pub score: String,
    pub over: String,
}

/// One over from the over-by-over slider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverSummary {
    pub over_number: String,
    pub balls: Vec<String>,
    pub total_runs: String,
}

/// Back/lay odds for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOdds {
    pub team_name: String,
    pub back_odds: Option<String>,
    pub lay_odds: Option<String>,
}

/// One yes/no entry of a session odds block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOddsEntry {
    pub option: String,
    pub value: String,
}

/// Session odds block shown for limited-overs matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOdds {
    pub session_name: String,
    pub odds: Vec<SessionOddsEntry>,
}

/// Odds snapshot for a limited-overs match: the favourite-team row plus
/// any session odds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitedOversOdds {
    pub first_team_data: Vec<TeamOdds>,
    pub session_data: Vec<SessionOdds>,
}

impl LimitedOversOdds {
    /// True when neither block was present on the page.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_team_data.is_empty() && self.session_data.is_empty()
    }
}

/// Selector for the second "Odds View" toggle button.
const ODDS_TOGGLE_SELECTOR: &str = ".odds-view-btn .view:nth-child(2)";

const SCORE_JS: &str = r"
    () => {
        const teamDivs = Array.from(document.querySelectorAll('.team-content'));
        const firstTeamDiv = teamDivs.length > 0 ? [teamDivs[0]] : [];
        return firstTeamDiv.map(div => {
            const teamName = div.querySelector('.team-name').textContent.trim();
            const score = div.querySelector('.runs span:nth-child(1)').textContent;
            const over = div.querySelector('.runs span:nth-child(2)').textContent;
            return { teamName, score, over };
        });
    }
";

const OVERS_JS: &str = r"
    () => {
        const overs = [];
        document.querySelectorAll('div#slideOver .overs-slide').forEach(overElement => {
            const overNumber = overElement.querySelector('span').textContent;
            const balls = Array.from(overElement.querySelectorAll('.over-ball')).map(ball => ball.textContent);
            const totalRuns = overElement.querySelector('.total').textContent;
            overs.push({ overNumber: overNumber.trim(), balls, totalRuns: totalRuns.trim() });
        });
        return overs;
    }
";

const TEST_ODDS_JS: &str = r"
    () => {
        const teamDivs = Array.from(document.querySelectorAll('.fav-odd .d-flex'));
        return teamDivs.map(div => {
            const teamName = div.querySelector('.team-name span').textContent;
            const odds = Array.from(div.querySelectorAll('.odd div')).map(div => div.textContent);
            return { teamName, backOdds: odds[0] ?? null, layOdds: odds[1] ?? null };
        });
    }
";

const LIMITED_OVERS_ODDS_JS: &str = r"
    () => {
        const teamDivs = Array.from(document.querySelectorAll('.fav-odd'));
        const firstTeamDiv = teamDivs.length > 0 ? [teamDivs[0]] : [];
        const sessionDiv = teamDivs.length == 2 ? [teamDivs[1]] : [];
        const firstTeamData = firstTeamDiv.map(div => {
            const teamName = div.querySelector('.rate-team-full-name').textContent;
            const odds = Array.from(div.querySelectorAll('.odd div')).map(div => div.textContent);
            return { teamName, backOdds: odds[0] ?? null, layOdds: odds[1] ?? null };
        });
        const sessionData = sessionDiv.map(div => {
            const sessionName = div.querySelector('.fav').textContent;
            const odds = Array.from(div.querySelectorAll('.yes-no-odds div')).map(div => {
                const option = div.querySelector('span:first-child').textContent;
                const value = div.querySelector('span:last-child').textContent.trim();
                return { option, value };
            });
            return { sessionName, odds };
        });
        return { firstTeamData, sessionData };
    }
";

/// The free-text result lines (wickets, boundaries, commentary snippets)
/// as an order-insensitive set.
pub async fn result_lines(page: &dyn PageSource) -> Result<BTreeSet<String>> {
    let lines = page.text_all(".result-box span").await?;
    Ok(lines.into_iter().collect())
}

/// Current run rate, when displayed.
pub async fn run_rate(page: &dyn PageSource) -> Result<Option<String>> {
    page.text(".team-run-rate .data").await
}

/// The "X need N runs to win" style summary line, when displayed.
pub async fn final_result(page: &dyn PageSource) -> Result<Option<String>> {
    page.text(".final-result.m-none").await
}

/// Score block of the batting team, when displayed.
pub async fn team_score(page: &dyn PageSource) -> Result<Option<TeamScore>> {
    let value = page.evaluate_json(SCORE_JS).await?;
    // Malformed blocks count as absent, not as an iteration failure
    let scores: Vec<TeamScore> = serde_json::from_value(value).unwrap_or_default();
    Ok(scores.into_iter().next())
}

/// Over-by-over summaries from the over slider.
pub async fn overs(page: &dyn PageSource) -> Result<Vec<OverSummary>> {
    let value = page.evaluate_json(OVERS_JS).await?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Odds rows for a test match (one per team).
pub async fn test_match_odds(page: &dyn PageSource) -> Result<Vec<TeamOdds>> {
    let value = page.evaluate_json(TEST_ODDS_JS).await?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Odds snapshot for a limited-overs match.
pub async fn limited_overs_odds(page: &dyn PageSource) -> Result<LimitedOversOdds> {
    let value = page.evaluate_json(LIMITED_OVERS_ODDS_JS).await?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Locate and activate the "Odds View" toggle.
///
/// Returns whether the toggle was found and clicked; the worker records
/// the outcome and retries on every iteration until it succeeds.
pub async fn activate_odds_view(page: &dyn PageSource, timeout_ms: u64) -> bool {
    if let Err(e) = page.wait_for(ODDS_TOGGLE_SELECTOR, timeout_ms).await {
        tracing::warn!("Odds view toggle not found: {}", e);
        return false;
    }
    match page.click(ODDS_TOGGLE_SELECTOR).await {
        Ok(()) => {
            tracing::info!("Clicked the odds view toggle");
            true
        }
        Err(e) => {
            tracing::warn!("Failed to click odds view toggle: {}", e);
            false
        }
    }
}
