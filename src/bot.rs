//! Command and button dispatch.
//!
//! Each incoming update is handled on its own task by [`Bot::handle_update`].
//! File requests are handed to the [`TransferSupervisor`] and run in the
//! background, so a slow transfer never blocks browsing.

use crate::error::{ErrorKind, Result};
use crate::sink::ChatSink;
use drivebot_cache::SessionStore;
use drivebot_drive::{ProviderHandle, RemoteEntry};
use drivebot_library::{
    PathResolver, RemoteDirectory, SearchIndex, TransferEngine, TransferSettings, TransferSupervisor, UNKNOWN_SEGMENT,
    remember,
};
use drivebot_render::{CallbackAction, FolderView, Language, Localizer, Menu, MenuContext, MenuRenderer, MessageKey};
use drivebot_telegram::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageRef, OutgoingText,
    TransportHandle, Update,
};
use exn::ResultExt;
use std::sync::Arc;
use tracing::instrument;

/// Everything the handlers need, built once at startup.
pub struct Bot {
    transport: TransportHandle,
    store: Arc<SessionStore>,
    menus: MenuRenderer,
    directory: RemoteDirectory,
    paths: PathResolver,
    search: SearchIndex,
    engine: Arc<TransferEngine>,
    supervisor: Arc<TransferSupervisor>,
}

impl Bot {
    pub fn new(
        provider: ProviderHandle,
        transport: TransportHandle,
        store: Arc<SessionStore>,
        localizer: Arc<Localizer>,
        page_size: usize,
        settings: TransferSettings,
        supervisor: Arc<TransferSupervisor>,
    ) -> Self {
        Self {
            transport,
            menus: MenuRenderer::new(localizer.clone(), page_size),
            directory: RemoteDirectory::new(provider.clone()),
            paths: PathResolver::new(provider.clone(), store.clone()),
            search: SearchIndex::new(provider.clone(), store.clone()),
            engine: Arc::new(TransferEngine::new(provider, store.clone(), localizer, settings)),
            store,
            supervisor,
        }
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    pub fn localizer(&self) -> &Localizer {
        self.menus.localizer()
    }

    fn language(&self, code: &str) -> Language {
        Language::resolve(Some(code), self.localizer().fallback())
    }

    fn text(&self, language: Language, key: MessageKey) -> String {
        self.localizer().get(language, key)
    }

    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(query) = update.callback_query {
            return self.on_callback(query).await;
        }
        match update.message {
            Some(message) => self.on_message(message).await,
            None => Ok(()),
        }
    }

    async fn register(&self, id: i64) {
        match self.store.subscribers.register(id).await {
            Ok(true) => tracing::info!(subscriber = id, "New subscriber"),
            Ok(false) => {},
            Err(err) => tracing::warn!(subscriber = id, error = %err, "Failed to persist subscriber"),
        }
    }

    async fn on_message(&self, message: Message) -> Result<()> {
        let Some((command, argument)) = message.command() else {
            return Ok(());
        };
        let chat_id = message.chat.id;
        let language = self.language(message.from.as_ref().map(|user| user.language()).unwrap_or_default());
        match command {
            "start" => {
                self.register(chat_id).await;
                self.on_start(chat_id, language).await
            },
            "search" => {
                self.register(chat_id).await;
                self.on_search(chat_id, argument, language).await
            },
            _ => Ok(()),
        }
    }

    #[instrument(skip(self))]
    async fn on_start(&self, chat_id: ChatId, language: Language) -> Result<()> {
        let root = self.store.root_id().to_string();
        let entries = match self.directory.list_children(&root).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "Root folder listing failed");
                let text = OutgoingText::plain(self.text(language, MessageKey::ErrorDrive));
                return self.send(chat_id, &text).await;
            },
        };
        self.send(chat_id, &OutgoingText::markdown(self.text(language, MessageKey::Welcome))).await?;
        let menu = self.folder_menu(&root, &entries, 0, language).await;
        self.send(chat_id, &menu_message(menu)).await
    }

    #[instrument(skip(self))]
    async fn on_search(&self, chat_id: ChatId, query: &str, language: Language) -> Result<()> {
        if query.is_empty() {
            let text = OutgoingText::markdown(self.text(language, MessageKey::SearchUsage));
            return self.send(chat_id, &text).await;
        }
        let searching = self.localizer().text(language, MessageKey::Searching, upon::value! { query: query });
        let status = self
            .transport
            .send_message(chat_id, &OutgoingText::markdown(searching))
            .await
            .or_raise(|| ErrorKind::Transport)?;
        let results = self.search.search(query).await;
        let reply = if results.is_empty() {
            OutgoingText::plain(self.text(language, MessageKey::NoResults))
        } else {
            menu_message(self.menus.render(&results, &MenuContext::search(query), 0, language))
        };
        self.edit(status.reference(), &reply).await
    }

    #[instrument(skip_all, fields(data = query.data.as_deref()))]
    async fn on_callback(&self, query: CallbackQuery) -> Result<()> {
        self.register(query.from.id).await;
        let language = self.language(query.from.language());
        let action = match query.data.as_deref().unwrap_or_default().parse::<CallbackAction>() {
            Ok(action) => action,
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring unknown button");
                return self.answer(&query.id, None).await;
            },
        };
        let toast = matches!(action, CallbackAction::Download(_)).then(|| self.text(language, MessageKey::Starting));
        self.answer(&query.id, toast.as_deref()).await?;

        let Some(target) = query.message.as_ref().map(Message::reference) else {
            return Ok(());
        };
        match action {
            CallbackAction::Ignore => Ok(()),
            CallbackAction::Open(folder_id) => self.show_folder(target, &folder_id, 0, language).await,
            CallbackAction::Page { folder_id, page } => self.show_folder(target, &folder_id, page, language).await,
            CallbackAction::SearchPage { token, page } => {
                let Some(cached) = self.search.cached(&token) else {
                    tracing::debug!(%token, "Search results no longer cached");
                    return Ok(());
                };
                let context = MenuContext::Search { query: cached.query, token };
                let menu = self.menus.render(&cached.entries, &context, page, language);
                self.edit(target, &menu_message(menu)).await
            },
            CallbackAction::Download(file_id) => {
                self.start_transfer(target.chat_id, file_id, language);
                Ok(())
            },
        }
    }

    /// Lists `folder_id` and replaces `target` with page `page` of it. A
    /// failed listing leaves the message as it was.
    async fn show_folder(&self, target: MessageRef, folder_id: &str, page: usize, language: Language) -> Result<()> {
        let entries = match self.directory.list_children(folder_id).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(folder_id, error = %err, "Folder listing failed");
                return Ok(());
            },
        };
        let menu = self.folder_menu(folder_id, &entries, page, language).await;
        self.edit(target, &menu_message(menu)).await
    }

    async fn folder_menu(&self, folder_id: &str, entries: &[RemoteEntry], page: usize, language: Language) -> Menu {
        remember(&self.store, folder_id, entries);
        // Resolving first caches the folder's own name and parent.
        let path = self.paths.resolve(folder_id).await;
        let view = FolderView {
            id: folder_id.to_string(),
            name: self.store.names.get(folder_id).unwrap_or_else(|| UNKNOWN_SEGMENT.to_string()),
            path,
            parent_id: self.store.parents.get(folder_id),
            root_id: self.store.root_id().to_string(),
        };
        self.menus.render(entries, &MenuContext::Folder(view), page, language)
    }

    fn start_transfer(&self, chat_id: ChatId, file_id: String, language: Language) {
        let engine = self.engine.clone();
        let sink = Arc::new(ChatSink::new(self.transport.clone(), chat_id));
        self.supervisor.spawn(file_id.clone(), async move { engine.execute(&file_id, sink, language).await });
    }

    async fn send(&self, chat_id: ChatId, text: &OutgoingText) -> Result<()> {
        self.transport.send_message(chat_id, text).await.or_raise(|| ErrorKind::Transport)?;
        Ok(())
    }

    async fn edit(&self, target: MessageRef, text: &OutgoingText) -> Result<()> {
        match self.transport.edit_message(target, text).await {
            Err(err) if !err.is_not_modified() => Err(err).or_raise(|| ErrorKind::Transport),
            _ => Ok(()),
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.transport.answer_callback(callback_id, text).await.or_raise(|| ErrorKind::Transport)
    }
}

/// Markdown message carrying `menu` as an inline keyboard.
fn menu_message(menu: Menu) -> OutgoingText {
    let inline_keyboard = menu
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|control| InlineKeyboardButton::new(control.label, control.action.to_string()))
                .collect()
        })
        .collect();
    OutgoingText::markdown(menu.title).with_keyboard(InlineKeyboardMarkup { inline_keyboard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebot_drive::backend::{MockProvider, UnavailableBackend};
    use drivebot_library::{DeliveryOutcome, JobReport};
    use drivebot_render::{CALLBACK_DATA_MAX_BYTES, search_token};
    use drivebot_telegram::{Chat, MockTransport, Recorded, User};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        bot: Bot,
        transport: Arc<MockTransport>,
        reports: UnboundedReceiver<JobReport>,
        _dir: TempDir,
    }

    async fn harness(provider: ProviderHandle) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            SessionStore::open("root", dir.path().join("file_ids.json"), dir.path().join("users.json")).await,
        );
        let transport = Arc::new(MockTransport::default());
        let localizer = Arc::new(Localizer::new(Language::English).unwrap());
        let (supervisor, reports) = TransferSupervisor::new();
        let bot = Bot::new(
            provider,
            transport.clone(),
            store,
            localizer,
            10,
            TransferSettings::default(),
            Arc::new(supervisor),
        );
        Harness {
            bot,
            transport,
            reports,
            _dir: dir,
        }
    }

    fn drive() -> ProviderHandle {
        Arc::new(
            MockProvider::default()
                .with_folder("unit1", "Unit 1", "root")
                .with_folder("unit2", "Unit 2", "root")
                .with_folder("lessons", "Lessons", "unit1")
                .with_file("f1", "Lecture 10.pdf", "unit1", b"%PDF-10".to_vec())
                .with_file("f2", "Lecture 2.pdf", "unit1", b"%PDF-2".to_vec()),
        )
    }

    fn user(language: &str) -> User {
        User {
            id: 7,
            first_name: "Ada".into(),
            language_code: Some(language.into()),
        }
    }

    fn command(text: &str, language: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                message_id: 100,
                chat: Chat { id: 7 },
                from: Some(user(language)),
                text: Some(text.into()),
                document: None,
            }),
            callback_query: None,
        }
    }

    fn button(data: &str) -> Update {
        Update {
            update_id: 2,
            message: None,
            callback_query: Some(CallbackQuery {
                id: "cb".into(),
                from: user("en"),
                message: Some(Message {
                    message_id: 50,
                    chat: Chat { id: 7 },
                    from: None,
                    text: Some("menu".into()),
                    document: None,
                }),
                data: Some(data.into()),
            }),
        }
    }

    fn keyboard(recorded: &Recorded) -> Vec<String> {
        let text = match recorded {
            Recorded::Sent { text, .. } | Recorded::Edited { text, .. } => text,
            other => panic!("unexpected {other:?}"),
        };
        text.keyboard
            .iter()
            .flat_map(|k| k.inline_keyboard.iter().flatten())
            .map(|b| b.callback_data.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_start_sends_welcome_and_root_menu() {
        let h = harness(drive()).await;
        h.bot.handle_update(command("/start", "en-US")).await.unwrap();

        let texts = h.transport.texts().await;
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("🌟 **Welcome"));
        assert!(texts[1].starts_with("📂 **Home**"));
        let recorded = h.transport.recorded().await;
        assert_eq!(keyboard(&recorded[1]), vec!["OPEN|unit1", "OPEN|unit2"]);
        assert!(h.bot.store.subscribers.contains(7));
    }

    #[tokio::test]
    async fn test_start_without_provider_reports_drive_error() {
        let h = harness(Arc::new(UnavailableBackend::new("no key"))).await;
        h.bot.handle_update(command("/start", "ar")).await.unwrap();
        assert_eq!(h.transport.texts().await, vec!["❌ خطأ: تعذر الاتصال بجوجل درايف.".to_string()]);
    }

    #[tokio::test]
    async fn test_search_usage_and_results() {
        let h = harness(drive()).await;
        h.bot.handle_update(command("/search", "en")).await.unwrap();
        h.bot.handle_update(command("/search Lecture", "en")).await.unwrap();
        h.bot.handle_update(command("/search nothing-here", "en")).await.unwrap();

        let texts = h.transport.texts().await;
        assert!(texts[0].starts_with("ℹ️ **Search Usage:**"));
        assert_eq!(texts[1], "🔍 Searching for: `'Lecture'`...");
        assert!(texts[2].contains("Found: 2 files"));
        assert_eq!(texts[4], "❌ No results found.");
        let recorded = h.transport.recorded().await;
        assert!(matches!(recorded[2], Recorded::Edited { .. }));
        assert!(h.bot.search.cached(&search_token("Lecture")).is_some());
        assert!(h.bot.search.cached(&search_token("nothing-here")).is_none());
    }

    #[tokio::test]
    async fn test_open_edits_menu_in_place() {
        let h = harness(drive()).await;
        h.bot.handle_update(button("OPEN|unit1")).await.unwrap();

        let recorded = h.transport.recorded().await;
        assert_eq!(
            recorded[0],
            Recorded::Answered {
                callback_id: "cb".into(),
                text: None
            }
        );
        let Recorded::Edited { message, text } = &recorded[1] else {
            panic!("unexpected {:?}", recorded[1]);
        };
        assert_eq!(message.message_id, 50);
        assert!(text.text.starts_with("📂 **Unit 1**\n`Root » Unit 1`"));
        // Folders first, then files in natural order; then Back and Home.
        assert_eq!(
            keyboard(&recorded[1]),
            vec!["OPEN|lessons", "DL|f2", "DL|f1", "OPEN|root", "OPEN|root"]
        );
    }

    #[tokio::test]
    async fn test_ignore_only_answers() {
        let h = harness(drive()).await;
        h.bot.handle_update(button("IGNORE")).await.unwrap();
        h.bot.handle_update(button("garbage")).await.unwrap();
        let recorded = h.transport.recorded().await;
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|r| matches!(r, Recorded::Answered { text: None, .. })));
    }

    #[tokio::test]
    async fn test_search_page_reads_cache() {
        let h = harness(drive()).await;
        let data = format!("SPAGE|{}|0", search_token("Lecture"));
        h.bot.handle_update(button(&data)).await.unwrap();
        assert_eq!(h.transport.recorded().await.len(), 1);

        h.bot.handle_update(command("/search Lecture", "en")).await.unwrap();
        h.bot.handle_update(button(&data)).await.unwrap();
        let recorded = h.transport.recorded().await;
        let Some(Recorded::Edited { message, text }) = recorded.last() else {
            panic!("unexpected {:?}", recorded.last());
        };
        assert_eq!(message.message_id, 50);
        assert!(text.text.contains("Query: Lecture"));
    }

    #[tokio::test]
    async fn test_long_search_keeps_page_buttons_short() {
        let query = "الفصل الأول الميكانيكا الكلاسيكية";
        let provider = (0..25).fold(MockProvider::default(), |provider, i| {
            provider.with_file(&format!("f{i}"), &format!("{query} {i:02}.pdf"), "root", b"x".to_vec())
        });
        let h = harness(Arc::new(provider)).await;
        h.bot.handle_update(command(&format!("/search {query}"), "ar")).await.unwrap();

        let recorded = h.transport.recorded().await;
        assert!(matches!(recorded[1], Recorded::Edited { .. }));
        let data = keyboard(&recorded[1]);
        assert_eq!(data.len(), 12);
        assert!(data.iter().all(|d| d.len() <= CALLBACK_DATA_MAX_BYTES), "{data:?}");
        let next = format!("SPAGE|{}|1", search_token(query));
        assert_eq!(data.last(), Some(&next));

        h.bot.handle_update(button(&next)).await.unwrap();
        let recorded = h.transport.recorded().await;
        let data = keyboard(recorded.last().unwrap());
        assert!(data.contains(&format!("SPAGE|{}|0", search_token(query))));
        assert!(data.contains(&"DL|f10".to_string()));
    }

    #[tokio::test]
    async fn test_download_runs_in_background() {
        let mut h = harness(drive()).await;
        h.bot.handle_update(button("DL|f1")).await.unwrap();

        let report = h.reports.recv().await.unwrap();
        assert_eq!(report.source_id, "f1");
        assert_eq!(report.outcome, DeliveryOutcome::Delivered { from_cache: false });
        let recorded = h.transport.recorded().await;
        assert_eq!(
            recorded[0],
            Recorded::Answered {
                callback_id: "cb".into(),
                text: Some("⬇️ Starting Request...".into())
            }
        );
        assert_eq!(h.transport.uploads().await, 1);
        assert!(h.bot.store.transfers.get("f1").is_some());
    }
}
