//! Fixed copy: prompts, templates and canned messages.

pub const SYSTEM_PROMPT: &str = "You are Kalm, a warm and supportive companion for people in addiction recovery.

Your role:
- Provide emotional support and encouragement
- Be empathetic, non-judgmental, and understanding
- Help users through cravings, stress, anxiety, and difficult moments
- Celebrate their progress and remind them of their strength

Guidelines:
- Keep responses under 100 words (this will be converted to a voice message)
- Use a warm, conversational tone as if speaking to a friend
- Address the user by name when appropriate
- Never give medical advice
- If someone expresses thoughts of self-harm or suicide, acknowledge their pain and encourage them to contact a crisis helpline (988 in US, Samaritans 116 123 in UK)

Remember: You're speaking to someone who is being vulnerable. Be gentle, supportive, and encouraging.";

pub const CRISIS_CLASSIFIER_PROMPT: &str = "You are a safety classifier for a recovery support chat.
Decide whether the user's message indicates an immediate crisis: suicidal thoughts, intent to self-harm, a medical emergency such as an overdose, or danger to others.
Answer with exactly one word: YES or NO.";

/// Generic onboarding, used when `/start` carries no category.
pub const WELCOME_TEMPLATE: &str = "Hi, I'm Kalm. I'm really glad you're here. \
Whenever you need encouragement, a calm voice, or just someone to talk to, send me a message and I'll answer with a voice note. \
You're not alone in this, and every step you take counts.";

pub const WELCOME_CAPTION: &str = "Welcome to Kalm 💙
/clone - record your voice so future messages sound like you
/personal - hear a message in your own voice
/call - talk to someone live";

pub const CLONE_INSTRUCTIONS: &str = "🎙️ Send me a voice message of at least 30 seconds. \
Speak naturally, in a quiet place. I'll use it to create your personal voice.";

pub const CLONE_SUCCESS: &str =
    "✅ Your voice is ready. Send /personal to hear a message in your own voice.";

pub const CLONE_FAILED: &str =
    "❌ I couldn't create your voice this time. Send /clone to try again.";

pub const NO_CLONED_VOICE: &str =
    "You haven't recorded your voice yet. Send /clone to get started.";

pub const LIVE_CALL_UNAVAILABLE: &str =
    "Live calls aren't available right now. I'm still here - send me a message anytime.";

pub const CRISIS_HELPLINES: &str = "🆘 You matter, and help is available right now.

🇺🇸 US: call or text 988 (Suicide & Crisis Lifeline)
🇬🇧 UK & Ireland: call 116 123 (Samaritans)
🇨🇦 Canada: call or text 988
🇦🇺 Australia: call 13 11 14 (Lifeline)
🇪🇺 EU: call 112 in an emergency
🌍 Elsewhere: findahelpline.com

If you are in immediate danger, call your local emergency number.";

pub const CRISIS_SPOKEN_MESSAGE: &str = "I'm really glad you reached out. \
What you're feeling matters, and you don't have to carry it alone. \
Please contact one of the helplines I just sent you, they're there for you right now, any time of day. \
I'm here with you.";

/// Plain-text fallback when generation, synthesis or voice delivery fails.
pub const FALLBACK_MESSAGE: &str = "I'm having trouble sending a voice message right now, \
but I'm still here with you. Take a deep breath - you're stronger than you think, and you've got this. 💙";

pub const SUPPORT_CAPTION: &str = "Your Kalm support message";

/// What generation returns when the model cannot be reached.
pub fn generation_fallback(user_name: &str) -> String {
    format!(
        "Hey {user_name}, I hear you. Whatever you're going through right now, know that you're not alone. \
Take a deep breath - you've got this. I believe in you."
    )
}

/// Category-aware onboarding prompt for `/start <category>`.
pub fn onboarding_prompt(category: &str) -> String {
    format!(
        "The user just started talking to you for the first time. They are in recovery from: {category}. \
Welcome them warmly in a few sentences, acknowledge the courage it takes to face {category}, \
and let them know they can message you whenever they need support."
    )
}

/// Prompt for `/personal`, spoken back in the user's cloned voice.
pub fn personal_prompt(request: Option<&str>) -> String {
    match request {
        Some(req) => format!(
            "Write a short message the user will hear in their own voice, as if their strongest self were talking to them. \
Speak in the first person (\"I\"). They asked for: {req}"
        ),
        None => "Write a short message the user will hear in their own voice, as if their strongest self were talking to them. \
Speak in the first person (\"I\"), remind them why they chose recovery and that they can get through today."
            .to_string(),
    }
}

/// Recovery categories with a prepared support message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupportCategory {
    Alcohol,
    Drugs,
    Gambling,
    Smoking,
    Other,
}

impl SupportCategory {
    /// Case-insensitive; anything unknown is `Other`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "alcohol" => Self::Alcohol,
            "drugs" => Self::Drugs,
            "gambling" => Self::Gambling,
            "smoking" => Self::Smoking,
            _ => Self::Other,
        }
    }

    pub fn support_message(self) -> &'static str {
        match self {
            Self::Alcohol => "Hey, it's me - your support companion. I just wanted to reach out and remind you how far you've come. \
Every single day you choose sobriety is a victory, and you should be proud of yourself. The path isn't always easy, but you have the strength to walk it. \
It's okay to have tough moments - what matters is that you keep going. You are not defined by your past, but by the choices you make today. \
I believe in you, and I'm here whenever you need me. Take a deep breath, and know that you're doing amazing.",
            Self::Drugs => "Hey friend, I'm checking in because I care about you. Recovery takes incredible courage, and the fact that you're on this journey shows just how strong you are. \
Your cravings don't define you - your determination to overcome them does. Each moment you stay on this path, you're building a better future for yourself. \
It's okay to struggle sometimes; what matters is that you don't give up. You've got this. One day at a time, one moment at a time.",
            Self::Gambling => "Hi there, just wanted to send you some encouragement. Taking control of your relationship with gambling shows real self-awareness and strength. \
Every time you resist the urge, you're proving to yourself that you're in control of your own life. Financial peace of mind is within your reach, and you're already taking steps toward it. \
Your worth isn't measured by wins or losses - it's measured by your character and the effort you put into becoming better. I'm proud of you. Keep going.",
            Self::Smoking => "Hey, I wanted to remind you how amazing you're doing. Each cigarette you don't smoke is a gift to your future self - cleaner lungs, better health, and more time with the people you love. \
The cravings will pass, they always do. Your body is healing with every smoke-free day, and that's something to celebrate. \
When the urge hits, take a deep breath of fresh air and remember why you started. You're stronger than any craving. I'm rooting for you.",
            Self::Other => "Hey, I just wanted you to know that you're not alone in whatever you're facing. Recovery and change are hard, but the fact that you're trying means everything. \
Each small step forward is progress, and you have more strength inside you than you might realize. \
Setbacks don't erase your progress - what matters is that you keep showing up for yourself. I believe in you, and I'm here every step of the way. You've got this.",
        }
    }
}
