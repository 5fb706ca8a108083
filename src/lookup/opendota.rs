use anyhow::{Context, Result};
use serde::Deserialize;

const BASE_URL: &str = "https://api.opendota.com/api/players";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRank {
    pub name: String,
    pub rank: i64,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    profile: Option<Profile>,
    solo_competitive_rank: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    personaname: Option<String>,
}

pub async fn player(client: &reqwest::Client, account_id: u64) -> Result<PlayerRank> {
    let url = format!("{}/{}", BASE_URL, account_id);
    let response: PlayerResponse = super::get_json(client, &url, "opendota").await?;
    player_rank(response, account_id)
}

fn player_rank(response: PlayerResponse, account_id: u64) -> Result<PlayerRank> {
    let profile = response
        .profile
        .with_context(|| format!("No profile for player {}", account_id))?;
    Ok(PlayerRank {
        name: profile.personaname.unwrap_or_default(),
        // Hidden or missing ranks count as unranked
        rank: response.solo_competitive_rank.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_rank() {
        let response: PlayerResponse = serde_json::from_str(
            r#"{"profile":{"account_id":1,"personaname":"Dendi"},"solo_competitive_rank":5120,"mmr_estimate":{"estimate":4000}}"#,
        )
        .unwrap();
        let rank = player_rank(response, 1).unwrap();
        assert_eq!(
            rank,
            PlayerRank {
                name: "Dendi".to_string(),
                rank: 5120
            }
        );
    }

    #[test]
    fn test_null_rank_is_zero() {
        let response: PlayerResponse = serde_json::from_str(
            r#"{"profile":{"personaname":"anon"},"solo_competitive_rank":null}"#,
        )
        .unwrap();
        assert_eq!(player_rank(response, 2).unwrap().rank, 0);
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let response: PlayerResponse =
            serde_json::from_str(r#"{"profile":null,"solo_competitive_rank":null}"#).unwrap();
        assert!(player_rank(response, 3).is_err());

        let response: PlayerResponse = serde_json::from_str(r#"{"error":"Internal"}"#).unwrap();
        assert!(player_rank(response, 3).is_err());
    }
}
