use std::collections::HashMap;

use rand::Rng;

/// Per-user charge points. Lives as long as the process; never persisted.
#[derive(Debug, Default)]
pub struct ChargeLedger {
    charges: HashMap<String, i64>,
}

impl ChargeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current charge, 0 for users never seen
    pub fn get(&self, user_id: &str) -> i64 {
        self.charges.get(user_id).copied().unwrap_or(0)
    }

    /// Add `delta` and return the new value
    pub fn add(&mut self, user_id: &str, delta: i64) -> i64 {
        let value = self.charges.entry(user_id.to_string()).or_insert(0);
        *value += delta;
        *value
    }
}

/// Random walk step: -1..=3 scaled by `multiplier`. Returns the message for the user.
pub fn charge_up<R: Rng + ?Sized>(
    ledger: &mut ChargeLedger,
    rng: &mut R,
    user_id: &str,
    multiplier: i64,
) -> String {
    let delta = (rng.gen_range(0..5) - 1) * multiplier;
    ledger.add(user_id, delta);
    charge_up_message(delta)
}

pub fn charge_up_message(delta: i64) -> String {
    if delta < 0 {
        format!("You lost {} charge points :lamo:", -delta)
    } else if delta > 0 {
        format!("You gained {} charge points :hype:", delta)
    } else {
        format!("You gained {} charge points :pepehands:", delta)
    }
}

pub fn charge_level_message(value: i64) -> String {
    // 69 is checked before the 1..20 band on purpose
    match value {
        v if v < 0 => format!("You have {} points charged up. :fuck:", v),
        0 => "You have no charge points stored up! :tensepepe:".to_string(),
        69 => ":smugpepe:".to_string(),
        v if v < 20 => format!("You have {} points charged up. :pogchamp:", v),
        v if v < 100 => format!("You have {} points charged up! :pog:", v),
        _ => "You have :pogchampignon: points charged up‽".to_string(),
    }
}

/// x1 at 8 characters, +1 for every 15 more
pub fn charging_multiplier(length: usize) -> i64 {
    (length as i64 - 8) / 15 + 1
}
