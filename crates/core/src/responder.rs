use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::intent::{normalize_message, Matcher, GREETING_TOKENS};
use crate::models::{MatchMode, ResponseCategory};

pub const DEFAULT_APP_NAME: &str = "RakshaSetu";

const APP_NAME_SLOT: &str = "{app}";

/// Source of the one non-deterministic choice the responder makes.
pub trait RandomSource {
    /// Returns an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Template {
    Fixed(&'static str),
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ResponseRule {
    pub category: ResponseCategory,
    pub matcher: Matcher,
    pub template: Template,
}

const GREETINGS: &[&str] = &[
    "Hello! 👋 How can I help you today?",
    "Hi there! 😊 What can I do for you?",
    "Hey! 👋 I'm here to help with {app} or answer any questions!",
    "Hello! 🤖 Ask me about the app or anything else you'd like to know!",
];

const FALLBACK: &str = "I can help you with:\n\n\
• SOS emergency features\n\
• Location sharing\n\
• Finding nearby hospitals, police, pharmacies\n\
• App settings and privacy\n\n\
Or ask me anything else you'd like to know!";

/// Ordered: the first matching rule answers.
pub const RESPONSE_RULES: &[ResponseRule] = &[
    ResponseRule {
        category: ResponseCategory::Greeting,
        matcher: Matcher::AnyOf(GREETING_TOKENS),
        template: Template::OneOf(GREETINGS),
    },
    ResponseRule {
        category: ResponseCategory::AboutBot,
        matcher: Matcher::AnyOf(&["about you", "who are you", "what are you", "your name"]),
        template: Template::Fixed(
            "🤖 **About Me**\n\n\
I'm your Safety Assistant for {app} - a women's safety app!\n\n\
I can help you with:\n\
• Understanding app features\n\
• SOS emergency procedures\n\
• Location sharing guidance\n\
• Finding nearby safety locations\n\
• Answering general questions\n\n\
I'm here to keep you safe and informed!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::SosFeature,
        matcher: Matcher::EitherOf(&[
            Matcher::AnyOf(&[
                "sos button",
                "sos feature",
                "sos alert",
                "panic button",
                "emergency button",
            ]),
            Matcher::AllOf(&[Matcher::AnyOf(&["sos"]), Matcher::AnyOf(&["how", "what", "use"])]),
        ]),
        template: Template::Fixed(
            "🚨 **SOS Emergency Alert**\n\n\
The SOS button is your quick emergency response:\n\n\
• Press the SOS button to send instant alerts\n\
• Your current location is automatically shared\n\
• Emergency messages are sent to all your saved contacts\n\
• Works even in low network areas\n\n\
💡 Tip: Add trusted contacts in Settings for faster emergency response!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::LocationSharing,
        matcher: Matcher::AllOf(&[
            Matcher::AnyOf(&["location", "gps"]),
            Matcher::AnyOf(&["share", "tracking", "how", "work"]),
        ]),
        template: Template::Fixed(
            "📍 **Location Sharing**\n\n\
Your safety through location:\n\n\
• Real-time GPS tracking\n\
• Instantly shares your exact location with saved contacts\n\
• Updates location continuously during emergency\n\
• Works with Google Maps for accurate positioning\n\n\
✅ Your location is only shared when YOU activate the SOS!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::NearbyHospital,
        matcher: Matcher::AnyOf(&["nearby hospital", "find hospital"]),
        template: Template::Fixed(
            "🏥 **Find Nearby Hospitals**\n\n\
To find hospitals near you:\n\n\
1. Go to the Map section from main screen\n\
2. Tap the RED button (Hospital icon)\n\
3. See all nearby hospitals with distances\n\
4. Tap any hospital to get directions\n\n\
The app shows hospitals within 5km radius!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::NearbyPolice,
        matcher: Matcher::AnyOf(&["nearby police", "find police"]),
        template: Template::Fixed(
            "👮 **Find Nearby Police Stations**\n\n\
To find police stations:\n\n\
1. Go to the Map section\n\
2. Tap the BLUE button (Police icon)\n\
3. See all nearby police stations with distances\n\
4. Tap to navigate instantly\n\n\
Quick access to law enforcement when you need help!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::NearbyPharmacy,
        matcher: Matcher::AnyOf(&["nearby pharmacy", "nearby medical", "find pharmacy"]),
        template: Template::Fixed(
            "💊 **Find Nearby Pharmacies**\n\n\
To find medical stores:\n\n\
1. Go to the Map section\n\
2. Tap the GREEN button (Pharmacy icon)\n\
3. See all nearby pharmacies with distances\n\
4. Get directions with one tap\n\n\
Find medicines and medical supplies near you!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::MapFeatures,
        matcher: Matcher::AllOf(&[
            Matcher::AnyOf(&["map"]),
            Matcher::AnyOf(&["how", "use", "work"]),
        ]),
        template: Template::Fixed(
            "🗺️ **Nearby Safety Locations**\n\n\
Find help around you:\n\n\
🏥 **Hospitals** - Nearest medical facilities\n\
👮 **Police Stations** - Law enforcement help\n\
💊 **Pharmacies** - Medical stores for medicines\n\n\
**Features:**\n\
• View all locations on interactive map\n\
• See distance from your current location\n\
• Tap any location for navigation\n\
• Opens Google Maps for directions\n\n\
Access the map from the main screen!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::EmergencyContacts,
        matcher: Matcher::AnyOf(&[
            "emergency contact",
            "trusted contact",
            "save contact",
            "add contact",
        ]),
        template: Template::Fixed(
            "📞 **Emergency Contacts**\n\n\
Save your trusted contacts:\n\n\
• Add family, friends, or trusted persons\n\
• They receive instant SOS alerts\n\
• Get your real-time location updates\n\
• Can be called directly in emergencies\n\n\
💡 Recommendation: Add at least 3-5 emergency contacts for best safety coverage!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::HowToUse,
        matcher: Matcher::AllOf(&[
            Matcher::AnyOf(&["how"]),
            Matcher::AnyOf(&["use", "work"]),
            Matcher::AnyOf(&["app", "this"]),
        ]),
        template: Template::Fixed(
            "📱 **How to Use {app}**\n\n\
**Step 1:** Add Emergency Contacts\n\
→ Go to Settings and save trusted contacts\n\n\
**Step 2:** Enable Permissions\n\
→ Allow location and SMS permissions\n\n\
**Step 3:** Use SOS Button\n\
→ Press when you need immediate help\n\n\
**Step 4:** Explore Safety Map\n\
→ Find nearby hospitals, police, pharmacies\n\n\
Always keep the app accessible for quick emergency response!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::FeatureOverview,
        matcher: Matcher::EitherOf(&[
            Matcher::AnyOf(&[
                "what can you do",
                "your features",
                "your capabilities",
                "tell me about yourself",
                "feature",
                "what can",
            ]),
            Matcher::AllOf(&[Matcher::AnyOf(&["what"]), Matcher::AnyOf(&["do"])]),
        ]),
        template: Template::Fixed(
            concat!(
                "⭐ **{app} Features**\n\n",
                "🚨 **SOS Emergency Alert**\n",
                "   → Quick panic button for instant help\n",
                "   → Sends alerts to all emergency contacts\n\n",
                "📍 **Live Location Sharing**\n",
                "   → Share real-time GPS coordinates\n",
                "   → Automatic location updates during emergency\n\n",
                "🗺️ **Safety Map**\n",
                "   → Find hospitals, police stations, pharmacies\n",
                "   → Navigate to nearest safety location\n\n",
                "📞 **Emergency Contacts**\n",
                "   → Save and manage trusted contacts\n",
                "   → Quick call/message in emergencies\n\n",
                "💬 **Smart AI Assistant (Me!)**\n",
                "   → Get help with app features\n",
                "   → Answer general questions\n\n",
                "What would you like to know more about?"
            ),
        ),
    },
    ResponseRule {
        category: ResponseCategory::Privacy,
        matcher: Matcher::AnyOf(&["privacy", "secure", "safe", "data protection", "permission"]),
        template: Template::Fixed(
            "🔒 **Privacy & Security**\n\n\
Your safety and privacy matter:\n\n\
✅ Location shared ONLY during SOS activation\n\
✅ No data stored on external servers\n\
✅ Contacts stored locally on your device\n\
✅ No tracking when app is not in use\n\
✅ You control all permissions\n\n\
We prioritize your privacy while ensuring your safety!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::Settings,
        matcher: Matcher::AnyOf(&["setting", "configure"]),
        template: Template::Fixed(
            "⚙️ **App Settings**\n\n\
Configure your safety preferences:\n\n\
• Add/Remove emergency contacts\n\
• Customize SOS message\n\
• Set emergency call preferences\n\
• Manage app permissions\n\
• Update personal information\n\n\
Access Settings from the main menu!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::Battery,
        matcher: Matcher::AnyOf(&["battery", "power", "performance"]),
        template: Template::Fixed(
            "🔋 **Battery & Performance**\n\n\
• App uses minimal battery power\n\
• GPS activated only when needed\n\
• Works efficiently even on low battery\n\
• SOS works in power-saving mode\n\n\
💡 Keep your phone charged when going out for extended periods!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::Network,
        matcher: Matcher::AnyOf(&["internet", "network", "offline", "connection"]),
        template: Template::Fixed(
            "📶 **Network Requirements**\n\n\
• SOS SMS works without internet\n\
• Location sharing needs GPS (no internet required)\n\
• Map features need internet connection\n\
• Basic emergency features work offline\n\n\
The app is designed to work in various network conditions!",
        ),
    },
    ResponseRule {
        category: ResponseCategory::Thanks,
        matcher: Matcher::AnyOf(&["thank", "thanks", "appreciate"]),
        template: Template::Fixed(
            "You're welcome! 😊 I'm here to help keep you safe and answer your questions. \
Feel free to ask me anything!\n\nStay safe! 💪",
        ),
    },
    ResponseRule {
        category: ResponseCategory::Goodbye,
        matcher: Matcher::AnyOf(&["bye", "goodbye", "see you"]),
        template: Template::Fixed(
            "Take care and stay safe! 🛡️ You can come back anytime if you need help with {app}. Goodbye!",
        ),
    },
];

/// Renders canned answers from the local knowledge base.
#[derive(Debug, Clone)]
pub struct Responder {
    app_name: String,
    mode: MatchMode,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME)
    }
}

impl Responder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            mode: MatchMode::Substring,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn categorize(&self, message: &str) -> ResponseCategory {
        self.rule_for(message)
            .map(|rule| rule.category)
            .unwrap_or(ResponseCategory::Fallback)
    }

    pub fn respond(&self, message: &str) -> String {
        self.respond_with(message, &mut ThreadRandom)
    }

    pub fn respond_with<R>(&self, message: &str, rng: &mut R) -> String
    where
        R: RandomSource + ?Sized,
    {
        match self.rule_for(message) {
            Some(rule) => self.render(rule.template, rng),
            None => FALLBACK.to_string(),
        }
    }

    pub fn greeting_variants(&self) -> Vec<String> {
        GREETINGS.iter().map(|text| self.fill(text)).collect()
    }

    pub fn welcome_message(&self) -> String {
        format!(
            "👋 Hi! I'm your Safety Assistant for {}.\n\n\
I can help you with:\n\n\
🚨 **App Features:**\n\
• SOS Emergency Alert\n\
• Location Sharing\n\
• Nearby Safety Locations\n\
• Emergency Contacts\n\
• App Settings & Privacy\n\n\
💬 **General Questions:**\n\
• General knowledge\n\
• Anything you want to know!\n\n\
What would you like to know?",
            self.app_name
        )
    }

    fn rule_for(&self, message: &str) -> Option<&'static ResponseRule> {
        let normalized = normalize_message(message);
        RESPONSE_RULES
            .iter()
            .find(|rule| rule.matcher.matches(&normalized, self.mode))
    }

    fn render<R>(&self, template: Template, rng: &mut R) -> String
    where
        R: RandomSource + ?Sized,
    {
        match template {
            Template::Fixed(text) => self.fill(text),
            Template::OneOf(options) if options.is_empty() => FALLBACK.to_string(),
            Template::OneOf(options) => {
                let index = rng.pick(options.len()).min(options.len() - 1);
                self.fill(options[index])
            }
        }
    }

    fn fill(&self, text: &str) -> String {
        text.replace(APP_NAME_SLOT, &self.app_name)
    }
}

pub fn respond(message: &str) -> String {
    Responder::default().respond(message)
}
