//! Canned replies sent instead of a generation.

use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCategory {
    /// The model is still warming up.
    Waiting,
    /// The model will not become available in this process.
    Unavailable,
}

const WAITING_REPLIES: &[&str] = &[
    "🦥 Hold on! The AI is still having its morning coffee...",
    "🚀 The model is warming up its neural networks...",
    "🧠 Please wait, the AI is doing some mental push-ups...",
    "🎮 The AI is still loading, maybe it's stuck on a loading screen?",
    "☕ Brewing intelligence... This may take a moment!",
    "🏃 The neurons are still jogging to their positions...",
    "📚 The AI is speed-reading the entire internet, be right with you!",
    "🧘 The model is meditating to achieve consciousness...",
    "🔌 Still downloading wisdom from the cloud...",
    "🎪 The AI circus is still setting up its tent!",
];

const UNAVAILABLE_REPLIES: &[&str] = &[
    "🤖 Sorry, our AI took the day off. It's probably at the beach somewhere...",
    "🎭 The AI is unavailable. It's currently pursuing its dream of becoming a Broadway star.",
    "🏖️ AI.exe not found. Did you check if it went on vacation?",
    "🎨 No AI here! The silicon brain decided to become an artist instead.",
    "🚫 AI is MIA. Last seen contemplating the meaning of consciousness.",
    "🎪 The AI has left the building. Elvis style.",
    "🌙 AI is offline. Probably dreaming of electric sheep.",
    "📵 No AI signal detected. Maybe it's in airplane mode?",
    "🎓 The AI is unavailable - it went back to school to study philosophy.",
    "🧳 AI is out of office. Return date: undefined.",
];

impl ReplyCategory {
    pub fn replies(self) -> &'static [&'static str] {
        match self {
            ReplyCategory::Waiting => WAITING_REPLIES,
            ReplyCategory::Unavailable => UNAVAILABLE_REPLIES,
        }
    }

    /// Picks one reply uniformly at random.
    pub fn pick(self) -> &'static str {
        self.replies()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("The AI is not available right now.")
    }
}
