//! Screen layouts. Everything here is pure: the same screen and links always
//! render to the same text and buttons.

use teloxide::utils::html;
use url::Url;

use crate::contract::{CallbackAction, Screen};

/// Popup shown when the subscription check fails.
pub const NOT_SUBSCRIBED_ALERT: &str =
    "❌ Вы еще не подписались на канал. Пожалуйста, подпишитесь и попробуйте снова.";

/// External links and labels baked into the screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLinks {
    /// How the channel is named in texts, e.g. `@om_valery`.
    pub channel_label: String,
    pub channel_url: Url,
    /// The companion bot running the "choose a platform" test.
    pub companion_bot_url: Url,
    pub project_site: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    Link { text: String, url: Url },
    Action { text: String, action: CallbackAction },
}

impl Button {
    fn link(text: &str, url: &Url) -> Self {
        Button::Link {
            text: text.to_string(),
            url: url.clone(),
        }
    }

    fn action(text: &str, action: CallbackAction) -> Self {
        Button::Action {
            text: text.to_string(),
            action,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Button::Link { text, .. } | Button::Action { text, .. } => text,
        }
    }
}

/// Text plus keyboard, one inner vec per keyboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedScreen {
    pub text: String,
    pub format: TextFormat,
    pub rows: Vec<Vec<Button>>,
}

impl RenderedScreen {
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    pub fn actions(&self) -> Vec<CallbackAction> {
        self.buttons()
            .filter_map(|b| match b {
                Button::Action { action, .. } => Some(*action),
                Button::Link { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MenuRenderer {
    links: MenuLinks,
}

impl MenuRenderer {
    pub fn new(links: MenuLinks) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &MenuLinks {
        &self.links
    }

    pub fn render(&self, screen: &Screen) -> RenderedScreen {
        match screen {
            Screen::WelcomeGate { name } => RenderedScreen {
                text: format!(
                    "👋 Привет, {name}!\n\n\
                     Я бот-ассистент проекта OM LAB.\n\n\
                     Для доступа ко всем функциям подпишитесь на канал {} 👇",
                    self.links.channel_label
                ),
                format: TextFormat::Plain,
                rows: self.subscription_rows(),
            },
            Screen::MainMenu {
                greeting: Some(name),
            } => RenderedScreen {
                text: format!(
                    "✨ Добро пожаловать, {name}!\n\n\
                     🤖 Я помогу вам найти оптимальную стратегию продвижения.\n\n\
                     Выберите действие:"
                ),
                format: TextFormat::Plain,
                rows: self.main_menu_rows(),
            },
            Screen::MainMenu { greeting: None } => RenderedScreen {
                text: "🤖 Выберите действие:".to_string(),
                format: TextFormat::Plain,
                rows: self.main_menu_rows(),
            },
            Screen::SubscriptionConfirmed { name } => RenderedScreen {
                text: format!(
                    "✅ Отлично! Вы подписаны.\n\n\
                     ✨ Добро пожаловать, {name}!\n\n\
                     Выберите действие:"
                ),
                format: TextFormat::Plain,
                rows: self.main_menu_rows(),
            },
            Screen::About => RenderedScreen {
                text: format!(
                    "📚 <b>О проекте OM LAB</b>\n\n\
                     Мы помогаем экспертам и предпринимателям:\n\
                     ✅ Выбрать оптимальные площадки для продвижения\n\
                     ✅ Автоматизировать маркетинг с помощью AI\n\
                     ✅ Построить эффективную стратегию присутствия\n\n\
                     🚀 Метод 25/8 - это эволюция подхода к продвижению в соцсетях.\n\n\
                     📢 Канал: {}\n\
                     🌐 Сайт: {}",
                    html::escape(&self.links.channel_label),
                    html::escape(&self.links.project_site),
                ),
                format: TextFormat::Html,
                rows: back_rows(),
            },
            Screen::Results => RenderedScreen {
                text: "📊 <b>Мои результаты</b>\n\n\
                       Здесь появятся рекомендации по площадкам для продвижения.\n\n\
                       🎯 Пройдите тест «Выбор площадки» из главного меню, \
                       чтобы получить персональную стратегию."
                    .to_string(),
                format: TextFormat::Html,
                rows: back_rows(),
            },
            Screen::Help => RenderedScreen {
                text: "Отправьте /start, чтобы открыть меню.".to_string(),
                format: TextFormat::Plain,
                rows: Vec::new(),
            },
        }
    }

    fn subscription_rows(&self) -> Vec<Vec<Button>> {
        vec![
            vec![Button::link("📢 Подписаться на канал", &self.links.channel_url)],
            vec![Button::action(
                "✅ Я подписался",
                CallbackAction::CheckSubscription,
            )],
        ]
    }

    fn main_menu_rows(&self) -> Vec<Vec<Button>> {
        vec![
            vec![Button::link(
                "🎯 Тест: Выбор площадки",
                &self.links.companion_bot_url,
            )],
            vec![Button::action("📊 Мои результаты", CallbackAction::MyResults)],
            vec![Button::action("💬 О проекте", CallbackAction::About)],
        ]
    }
}

fn back_rows() -> Vec<Vec<Button>> {
    vec![vec![Button::action(
        "« Назад в меню",
        CallbackAction::BackToMenu,
    )]]
}
