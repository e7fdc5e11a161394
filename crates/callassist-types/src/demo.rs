//! Scripted demo walkthrough: three canned transcript turns processed in order.

use serde::{Deserialize, Serialize};

pub const EXAMPLE_TRANSCRIPT_TURN_1: &str = "
Austin: Thank you for calling QuickShip Logistics, this is Austin speaking. How may I assist you today?
Avery Johnson: Hi Austin, this is Avery Johnson. I need to schedule a pickup for multiple packages at different locations, but your online system keeps giving me errors.
Austin: I apologize for the inconvenience, Mr. Johnson. I'd be happy to help you with those multiple pickups. Could you please provide your account number so I can pull up your information?
Avery Johnson: Yes, it's AJ78542. Look, I've been trying to arrange this for two days now. I have three different pickup locations, all with different freight classes, and your system just can't seem to handle it.
";

pub const EXAMPLE_TRANSCRIPT_TURN_2: &str = "
Austin: I see your account here, Mr. Johnson. You're right - our system has limitations with multi-point pickups when different freight classifications are involved. For your Class 70 machinery parts and Class 125 electronics, we'll need to create separate BOLs to ensure proper handling through our sortation hubs.
Avery Johnson: That's ridiculous! I've used other carriers that can handle this easily. And now I'm concerned about transit times - my customers need these deliveries by Friday, and your last mile optimization has been terrible lately.
Austin: I understand your frustration. What I can do is manually create a consolidated pickup request and apply our expedited service to ensure delivery before Friday. There will be an additional handling fee of $45 per location, but I can waive the route optimization surcharge given the circumstances.
Avery Johnson: Fine, but I'm not happy about these extra fees. Will this at least guarantee that all packages move through the same regional hub? Last time my shipments were split between facilities and arrived three days apart.
";

pub const EXAMPLE_TRANSCRIPT_TURN_3: &str = "
Austin: Yes, I'll add special instructions to keep all packages within our Eastern consolidation network. I'll also assign a dedicated dispatcher to monitor these shipments and provide you with tracking updates at each checkpoint. Would you like me to proceed with scheduling these pickups for tomorrow morning?
Avery Johnson: Yes, schedule them for tomorrow morning, but I need specific time windows. The Chicago location can only do 8-10 AM, the Detroit warehouse needs afternoon pickup, and my Cleveland facility closes at 3 PM sharp.
Austin: I've noted those time constraints, Mr. Johnson. I can confirm Chicago for 8-10 AM, Cleveland for 12-2 PM, and Detroit for 3-5 PM. Our drivers will call 30 minutes before arrival. Are there any special handling instructions I should be aware of? Any of these shipments contain hazmat materials?
Avery Johnson: The Detroit shipment has lithium batteries, Class 9 hazmat. And I need temperature-controlled transport for the Cleveland pharmaceuticals - they can't exceed 77 degrees Fahrenheit. Your driver missed that requirement last time.
Austin: Thank you for that information. I've added the Class 9 hazmat designation for the Detroit pickup and specified temperature control requirements for the Cleveland pharmaceuticals. I'll also flag this in our TMS for special handling and assign a reefer unit for the Cleveland pickup. Would you like me to email you the pre-printed labels and BOLs for each location?
Avery Johnson: Yes, email those right away. And listen, I need better communication this time. If there are any delays at the cross-dock or issues with customs clearance for the international pieces, someone better call me immediately, not after the delivery window is missed.
Austin: Absolutely, Mr. Johnson. I'm setting up automated alerts to your email and phone for each milestone scan. I'll personally monitor these shipments through our hub transfer and assign them priority status during sortation. I've also noted your account for a follow-up call tomorrow afternoon to confirm all pickups were completed successfully. Is there anything else I can assist you with today?
";

/// The whole call in one piece. Served to the page for the "full transcript"
/// button; it is not a demo turn.
pub fn example_transcript_full() -> String {
    format!(
        "\n{}\n{}\n{}\n",
        EXAMPLE_TRANSCRIPT_TURN_1.trim(),
        EXAMPLE_TRANSCRIPT_TURN_2.trim(),
        EXAMPLE_TRANSCRIPT_TURN_3.trim()
    )
}

/// One of the three canned turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoTurn {
    One,
    Two,
    Three,
}

impl DemoTurn {
    pub const ALL: [DemoTurn; 3] = [DemoTurn::One, DemoTurn::Two, DemoTurn::Three];

    pub fn number(&self) -> u8 {
        match self {
            DemoTurn::One => 1,
            DemoTurn::Two => 2,
            DemoTurn::Three => 3,
        }
    }

    pub fn transcript(&self) -> &'static str {
        match self {
            DemoTurn::One => EXAMPLE_TRANSCRIPT_TURN_1,
            DemoTurn::Two => EXAMPLE_TRANSCRIPT_TURN_2,
            DemoTurn::Three => EXAMPLE_TRANSCRIPT_TURN_3,
        }
    }

    /// Match a submitted transcript against the canned turns, ignoring
    /// surrounding whitespace on both sides.
    pub fn matching(transcript: &str) -> Option<DemoTurn> {
        let submitted = transcript.trim();
        Self::ALL
            .into_iter()
            .find(|turn| turn.transcript().trim() == submitted)
    }
}

/// Progress through the scripted demo.
///
/// `current_turn` only moves forward and never past the smallest turn that
/// has not been processed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoState {
    pub current_turn: u8,
    pub turn1_processed: bool,
    pub turn2_processed: bool,
    pub turn3_processed: bool,
}

impl Default for DemoState {
    fn default() -> Self {
        Self {
            current_turn: 1,
            turn1_processed: false,
            turn2_processed: false,
            turn3_processed: false,
        }
    }
}

impl DemoState {
    pub fn is_processed(&self, turn: DemoTurn) -> bool {
        match turn {
            DemoTurn::One => self.turn1_processed,
            DemoTurn::Two => self.turn2_processed,
            DemoTurn::Three => self.turn3_processed,
        }
    }

    fn mark_processed(&mut self, turn: DemoTurn) {
        match turn {
            DemoTurn::One => self.turn1_processed = true,
            DemoTurn::Two => self.turn2_processed = true,
            DemoTurn::Three => self.turn3_processed = true,
        }
    }

    /// Smallest turn not yet processed; turn 3 once everything is done
    fn frontier(&self) -> u8 {
        DemoTurn::ALL
            .into_iter()
            .find(|turn| !self.is_processed(*turn))
            .map(|turn| turn.number())
            .unwrap_or(3)
    }

    /// Apply a successfully processed transcript. Returns the matched turn,
    /// or `None` for free-form input, which leaves the state untouched.
    pub fn record_transcript(&mut self, transcript: &str) -> Option<DemoTurn> {
        let turn = DemoTurn::matching(transcript)?;
        self.mark_processed(turn);
        self.current_turn = self.current_turn.max(self.frontier());
        Some(turn)
    }

    pub fn all_processed(&self) -> bool {
        self.turn1_processed && self.turn2_processed && self.turn3_processed
    }
}
