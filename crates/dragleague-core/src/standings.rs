// Read path: per-player score breakdowns and the league table. Nothing here
// is persisted; scores are derived from the current results every time.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::bonus::{score_bonus, BonusScore};
use crate::error::ConsistencyWarning;
use crate::model::{League, Player};
use crate::ranking::{
    ordinal, score_lip_sync_assassin, score_rankings, score_weekly_picks, RankingScore, WeeklyScore,
};

/// Everything one player has earned so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub player_id: Uuid,
    pub display_name: String,
    pub ranking: RankingScore,
    pub weekly: WeeklyScore,
    pub lip_sync: WeeklyScore,
    pub bonus: BonusScore,
    pub total: u32,
}

impl ScoreBreakdown {
    /// Consistency warnings collected from every component.
    pub fn warnings(&self) -> impl Iterator<Item = &ConsistencyWarning> {
        self.ranking
            .warnings
            .iter()
            .chain(&self.weekly.warnings)
            .chain(&self.lip_sync.warnings)
            .chain(&self.bonus.warnings)
    }
}

pub fn score_player(league: &League, player: &Player) -> ScoreBreakdown {
    let ranking = score_rankings(&player.rankings, league);
    let weekly = score_weekly_picks(
        &player.weekly_picks,
        &league.challenge_winners,
        &league.queen_names,
        league.challenge_points,
    );
    let lip_sync = score_lip_sync_assassin(
        player.lip_sync_assassin.as_deref(),
        &league.lip_sync_winners,
        &league.queen_names,
        league.lip_sync_points,
    );
    let bonus = score_bonus(&league.bonus_categories, &player.bonus_predictions);
    let total = ranking.points + weekly.points + lip_sync.points + bonus.points;

    ScoreBreakdown {
        player_id: player.id,
        display_name: player.display_name.clone(),
        ranking,
        weekly,
        lip_sync,
        bonus,
        total,
    }
}

/// One row of the league table.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    /// Competition rank: tied totals share a rank and the next rank skips.
    pub rank: u32,
    pub ordinal: String,
    pub breakdown: ScoreBreakdown,
}

/// Flat view of a standing for tabular export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub rank: String,
    pub player: String,
    pub ranking: u32,
    pub weekly: u32,
    pub lip_sync: u32,
    pub bonus: u32,
    pub total: u32,
}

impl From<&Standing> for StandingRow {
    fn from(s: &Standing) -> Self {
        StandingRow {
            rank: s.ordinal.clone(),
            player: s.breakdown.display_name.clone(),
            ranking: s.breakdown.ranking.points,
            weekly: s.breakdown.weekly.points,
            lip_sync: s.breakdown.lip_sync.points,
            bonus: s.breakdown.bonus.points,
            total: s.breakdown.total,
        }
    }
}

/// Score every player and order them by total (descending), then display
/// name. Warnings are logged once per player.
pub fn standings(league: &League, players: &[Player]) -> Vec<Standing> {
    let mut scored: Vec<ScoreBreakdown> = players.iter().map(|p| score_player(league, p)).collect();
    scored.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    for breakdown in &scored {
        for warning in breakdown.warnings() {
            warn!(
                "league {}: scoring {}: {}",
                league.id, breakdown.display_name, warning
            );
        }
    }

    let mut out: Vec<Standing> = Vec::with_capacity(scored.len());
    for (idx, breakdown) in scored.into_iter().enumerate() {
        let rank = match out.last() {
            Some(prev) if prev.breakdown.total == breakdown.total => prev.rank,
            _ => idx as u32 + 1,
        };
        out.push(Standing {
            rank,
            ordinal: ordinal(rank),
            breakdown,
        });
    }
    out
}
