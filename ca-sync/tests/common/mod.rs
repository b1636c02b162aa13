//! In-memory collaborators for orchestrator and API tests

#![allow(dead_code)]

use async_trait::async_trait;
use ca_common::config::SyncConfig;
use ca_common::events::EventBus;
use ca_common::{
    Confirmations, Error, Expense, FinancialSetting, LocalSnapshot, Result, ScheduleSlot, Snapshot,
    Teacher,
};
use ca_sync::stores::{LessonApiError, LessonSource, LocalCache, RawLesson, RemoteStore};
use ca_sync::SyncOrchestrator;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeCache {
    pub stored: Mutex<LocalSnapshot>,
    pub corrupt: AtomicBool,
    pub saves: AtomicUsize,
}

impl FakeCache {
    pub fn with(local: LocalSnapshot) -> Self {
        Self {
            stored: Mutex::new(local),
            ..Default::default()
        }
    }

    pub fn stored(&self) -> LocalSnapshot {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalCache for FakeCache {
    async fn load(&self) -> Result<LocalSnapshot> {
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(Error::Internal("Malformed cache entry ca_t".to_string()));
        }
        Ok(self.stored())
    }

    async fn save(&self, snapshot: &LocalSnapshot) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = snapshot.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.corrupt.store(false, Ordering::SeqCst);
        *self.stored.lock().unwrap() = LocalSnapshot::default();
        Ok(())
    }
}

/// Row store keyed like the real tables, counting every write call
#[derive(Default)]
pub struct FakeRemote {
    pub teachers: Mutex<BTreeMap<String, Teacher>>,
    pub slots: Mutex<BTreeMap<String, ScheduleSlot>>,
    pub confirmations: Mutex<Confirmations>,
    pub expenses: Mutex<BTreeMap<String, Expense>>,
    pub settings: Mutex<BTreeMap<String, FinancialSetting>>,
    pub offline: AtomicBool,
    pub upserts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FakeRemote {
    pub fn with(snapshot: &Snapshot) -> Self {
        let remote = Self::default();
        remote.put(snapshot);
        remote
    }

    pub fn put(&self, snapshot: &Snapshot) {
        let mut teachers = self.teachers.lock().unwrap();
        for t in &snapshot.teachers {
            teachers.insert(t.id.clone(), t.clone());
        }
        let mut slots = self.slots.lock().unwrap();
        for s in &snapshot.slots {
            slots.insert(s.id.clone(), s.clone());
        }
        let mut confirmations = self.confirmations.lock().unwrap();
        for (date, ids) in &snapshot.confirmations {
            confirmations.insert(date.clone(), ids.clone());
        }
        let mut expenses = self.expenses.lock().unwrap();
        for e in &snapshot.expenses {
            expenses.insert(e.id.clone(), e.clone());
        }
    }

    pub fn writes(&self) -> usize {
        self.upserts.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }

    pub fn teacher_ids(&self) -> Vec<String> {
        self.teachers.lock().unwrap().keys().cloned().collect()
    }

    pub fn slot_ids(&self) -> Vec<String> {
        self.slots.lock().unwrap().keys().cloned().collect()
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::Internal("remote store unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn get_teachers(&self) -> Result<Vec<Teacher>> {
        self.check()?;
        Ok(self.teachers.lock().unwrap().values().cloned().collect())
    }

    async fn get_slots(&self) -> Result<Vec<ScheduleSlot>> {
        self.check()?;
        Ok(self.slots.lock().unwrap().values().cloned().collect())
    }

    async fn get_confirmations(&self) -> Result<Confirmations> {
        self.check()?;
        Ok(self.confirmations.lock().unwrap().clone())
    }

    async fn get_expenses(&self) -> Result<Vec<Expense>> {
        self.check()?;
        Ok(self.expenses.lock().unwrap().values().cloned().collect())
    }

    async fn upsert_all(&self, snapshot: &Snapshot) -> Result<()> {
        self.check()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.put(snapshot);
        Ok(())
    }

    async fn delete_teachers(&self, ids: &[String]) -> Result<()> {
        self.check()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut teachers = self.teachers.lock().unwrap();
        for id in ids {
            teachers.remove(id);
        }
        Ok(())
    }

    async fn delete_slots(&self, ids: &[String]) -> Result<()> {
        self.check()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut slots = self.slots.lock().unwrap();
        for id in ids {
            slots.remove(id);
        }
        Ok(())
    }

    async fn delete_expenses(&self, ids: &[String]) -> Result<()> {
        self.check()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut expenses = self.expenses.lock().unwrap();
        for id in ids {
            expenses.remove(id);
        }
        Ok(())
    }

    async fn financial_setting(&self, month: &str) -> Result<Option<FinancialSetting>> {
        self.check()?;
        Ok(self.settings.lock().unwrap().get(month).cloned())
    }

    async fn save_financial_setting(&self, setting: &FinancialSetting) -> Result<()> {
        self.check()?;
        self.settings
            .lock()
            .unwrap()
            .insert(setting.month.clone(), setting.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLessons {
    pub lessons: Mutex<Vec<RawLesson>>,
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeLessons {
    pub fn set(&self, lessons: Vec<RawLesson>) {
        *self.lessons.lock().unwrap() = lessons;
    }
}

#[async_trait]
impl LessonSource for FakeLessons {
    async fn fetch_lessons_in_range(
        &self,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> std::result::Result<Vec<RawLesson>, LessonApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LessonApiError::Status(500, "boom".to_string()));
        }
        Ok(self.lessons.lock().unwrap().clone())
    }
}

pub struct Harness {
    pub cache: Arc<FakeCache>,
    pub remote: Arc<FakeRemote>,
    pub lessons: Arc<FakeLessons>,
    pub bus: EventBus,
    pub orchestrator: Arc<SyncOrchestrator>,
}

/// Long debounce so tests drive pushes explicitly
pub fn test_config() -> SyncConfig {
    SyncConfig {
        debounce_ms: 60_000,
        heal_on_load: false,
        ..SyncConfig::default()
    }
}

pub fn harness(local: LocalSnapshot, remote: Snapshot, config: SyncConfig) -> Harness {
    let cache = Arc::new(FakeCache::with(local));
    let remote = Arc::new(FakeRemote::with(&remote));
    let lessons = Arc::new(FakeLessons::default());
    let bus = EventBus::new(256);
    let orchestrator = Arc::new(SyncOrchestrator::new(
        cache.clone(),
        remote.clone(),
        lessons.clone(),
        bus.clone(),
        config,
    ));
    Harness {
        cache,
        remote,
        lessons,
        bus,
        orchestrator,
    }
}

pub fn slot(id: &str, teacher: &str, dow: u8, time: &str, student: &str) -> ScheduleSlot {
    ScheduleSlot {
        id: id.to_string(),
        teacher_id: teacher.to_string(),
        day_of_week: dow,
        time: time.to_string(),
        student_name: student.to_string(),
        instrument: "Violão".to_string(),
        is_experimental: false,
        date: None,
        created_at: 1_700_000_000_000,
    }
}

pub fn lesson(id: i64, teacher: &str, student: &str, starts_at: &str) -> RawLesson {
    RawLesson {
        id,
        cancelled: false,
        teacher_names: vec![teacher.to_string()],
        student_name: Some(student.to_string()),
        course_name: Some("Piano".to_string()),
        category: Some("Regular".to_string()),
        starts_at: starts_at.to_string(),
        ends_at: String::new(),
    }
}

pub fn local_of(snapshot: Snapshot) -> LocalSnapshot {
    LocalSnapshot {
        snapshot,
        ..Default::default()
    }
}
