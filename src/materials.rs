//! Course material catalog with a text-content cache.
//!
//! Entries come from the TOML `[[materials]]` table, from the built-in weekly
//! seed catalog when none are configured, or from UI uploads of
//! already-extracted text. Inline text lives only in its entry; text for
//! `path` entries is read lazily and cached on first use.

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::Arc,
};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::MaterialCfg;
use crate::domain::Language;
use crate::error::GenerationError;

/// Listing entry; the text itself is never part of the catalog view.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub title: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    pub language: Language,
}

#[derive(Clone, Debug)]
enum Body {
    Inline(Arc<str>),
    File(PathBuf),
}

#[derive(Clone, Debug)]
struct Entry {
    material: Material,
    body: Body,
}

#[derive(Default)]
struct Catalog {
    entries: HashMap<String, Entry>,
    /// Upload ids, oldest first.
    uploads: VecDeque<String>,
}

#[derive(Clone)]
pub struct MaterialStore {
    catalog: Arc<RwLock<Catalog>>,
    file_cache: Arc<RwLock<HashMap<String, String>>>,
    max_uploads: usize,
}

impl Default for MaterialStore {
    fn default() -> Self {
        Self::with_entries(HashMap::new(), DEFAULT_MAX_UPLOADS)
    }
}

pub const DEFAULT_MAX_UPLOADS: usize = 64;

struct Seed {
    id: &'static str,
    title: &'static str,
    kind: &'static str,
    week: &'static str,
    text: &'static str,
}

static SEED_CATALOG: &[Seed] = &[
    Seed {
        id: "w1-ch1",
        title: "Kapitel 1 - Materialklassen",
        kind: "chapter",
        week: "week1",
        text: "Werkstoffe lassen sich in Metalle, Keramiken, Polymere und Verbundwerkstoffe einteilen. \
Metalle zeichnen sich durch metallische Bindung, gute elektrische Leitfähigkeit und Verformbarkeit aus. \
Keramiken sind ionisch oder kovalent gebunden, hart, spröde und temperaturbeständig. Polymere bestehen \
aus langen Kettenmolekülen und besitzen eine geringe Dichte. Verbundwerkstoffe kombinieren die Vorteile \
mehrerer Klassen, etwa glasfaserverstärkte Kunststoffe. Kristalline Werkstoffe besitzen eine Fernordnung \
der Atome, amorphe Werkstoffe wie Gläser nur eine Nahordnung.",
    },
    Seed {
        id: "w1-ch2",
        title: "Kapitel 2 - Strukturen",
        kind: "chapter",
        week: "week1",
        text: "Metalle kristallisieren meist in kubisch-raumzentrierten (krz), kubisch-flächenzentrierten (kfz) \
oder hexagonal dichtest gepackten (hdp) Gittern. Die Einheitszelle ist die kleinste Wiederholungseinheit \
des Gitters. Im kfz-Gitter hat jedes Atom 12 nächste Nachbarn, die Packungsdichte beträgt 0,74; das \
krz-Gitter erreicht 0,68 bei einer Koordinationszahl von 8. Millersche Indizes beschreiben Ebenen und \
Richtungen im Kristall.",
    },
    Seed {
        id: "w2-ch3",
        title: "Kapitel 3 - Fehlstellen",
        kind: "chapter",
        week: "week2",
        text: "Reale Kristalle enthalten Gitterfehler: Leerstellen und Zwischengitteratome als Punktdefekte, \
Versetzungen als Liniendefekte und Korngrenzen als Flächendefekte. Die Leerstellenkonzentration steigt \
exponentiell mit der Temperatur. Die Bewegung von Versetzungen ermöglicht plastische Verformung; \
Korngrenzen behindern diese Bewegung, weshalb feinkörnige Werkstoffe eine höhere Streckgrenze besitzen.",
    },
    Seed {
        id: "w2-ch4",
        title: "Kapitel 4 - Diffusion",
        kind: "chapter",
        week: "week2",
        text: "Diffusion beschreibt den thermisch aktivierten Platzwechsel von Atomen. Das erste Ficksche Gesetz \
setzt den Diffusionsfluss proportional zum Konzentrationsgradienten, J = -D dC/dx. Der \
Diffusionskoeffizient folgt einer Arrhenius-Beziehung D = D0 exp(-Q/RT). Substitutionsatome diffundieren \
über Leerstellen, kleine Atome wie Kohlenstoff über Zwischengitterplätze.",
    },
    Seed {
        id: "w3-ch5",
        title: "Kapitel 5 - Elastisches Verhalten",
        kind: "chapter",
        week: "week3",
        text: "Im elastischen Bereich gilt das Hookesche Gesetz: Spannung ist proportional zur Dehnung, der \
Proportionalitätsfaktor ist der Elastizitätsmodul E. Die Querkontraktionszahl beschreibt das Verhältnis \
von Quer- zu Längsdehnung. Der Schubmodul G hängt über G = E / (2(1 + v)) mit E zusammen. Elastische \
Verformung ist vollständig reversibel.",
    },
    Seed {
        id: "w4-ch7",
        title: "Kapitel 7 - Mechanische Eigenschaften von Metallen",
        kind: "chapter",
        week: "week4",
        text: "Im Zugversuch werden Elastizitätsmodul, Streckgrenze, Zugfestigkeit und Bruchdehnung bestimmt. \
Die Streckgrenze wird meist als Spannung bei 0,2 % plastischer Dehnung angegeben. Plastische Verformung \
erfolgt durch Versetzungsgleiten auf dicht gepackten Ebenen. Die Hall-Petch-Beziehung verknüpft die \
Korngröße mit der Streckgrenze: feinere Körner ergeben höhere Festigkeit.",
    },
];

impl MaterialStore {
    fn with_entries(entries: HashMap<String, Entry>, max_uploads: usize) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog { entries, uploads: VecDeque::new() })),
            file_cache: Arc::default(),
            max_uploads: max_uploads.max(1),
        }
    }

    /// Catalog from config entries, or the built-in seed if none are usable.
    #[instrument(level = "info", skip_all, fields(configured = configured.len()))]
    pub fn from_config(configured: &[MaterialCfg]) -> Self {
        let mut entries = HashMap::new();
        for cfg in configured {
            let body = match (&cfg.text, &cfg.path) {
                (Some(text), _) if !text.trim().is_empty() => Body::Inline(Arc::from(text.as_str())),
                (_, Some(path)) => Body::File(path.clone()),
                _ => {
                    warn!(target: "studykit_backend", id = %cfg.id, "Skipping material: neither text nor path");
                    continue;
                }
            };
            let material = Material {
                id: cfg.id.clone(),
                title: cfg.title.clone(),
                kind: cfg.kind.clone().unwrap_or_else(|| "lecture".to_string()),
                week: cfg.week.clone(),
                language: cfg.language,
            };
            entries.insert(cfg.id.clone(), Entry { material, body });
        }

        if entries.is_empty() {
            for seed in SEED_CATALOG {
                let material = Material {
                    id: seed.id.to_string(),
                    title: seed.title.to_string(),
                    kind: seed.kind.to_string(),
                    week: Some(seed.week.to_string()),
                    language: Language::De,
                };
                entries.insert(seed.id.to_string(), Entry { material, body: Body::Inline(Arc::from(seed.text)) });
            }
        }

        info!(target: "studykit_backend", materials = entries.len(), "Material catalog ready");
        Self::with_entries(entries, DEFAULT_MAX_UPLOADS)
    }

    pub fn with_upload_limit(mut self, max_uploads: usize) -> Self {
        self.max_uploads = max_uploads.max(1);
        self
    }

    /// All materials, sorted by id.
    pub async fn list(&self) -> Vec<Material> {
        let mut out: Vec<Material> =
            self.catalog.read().await.entries.values().map(|e| e.material.clone()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Materials of one course week, sorted by id. Empty for an unknown week.
    pub async fn list_by_week(&self, week: &str) -> Vec<Material> {
        let mut out = self.list().await;
        out.retain(|m| m.week.as_deref() == Some(week));
        out
    }

    pub async fn get_material(&self, id: &str) -> Result<Material, GenerationError> {
        self.catalog
            .read()
            .await
            .entries
            .get(id)
            .map(|e| e.material.clone())
            .ok_or_else(|| GenerationError::MaterialNotFound(id.to_string()))
    }

    /// Text of a material; loads and caches file-backed entries.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_source_text(&self, id: &str) -> Result<String, GenerationError> {
        let body = {
            let catalog = self.catalog.read().await;
            catalog
                .entries
                .get(id)
                .map(|e| e.body.clone())
                .ok_or_else(|| GenerationError::MaterialNotFound(id.to_string()))?
        };

        let path = match body {
            Body::Inline(text) => return Ok(text.to_string()),
            Body::File(path) => path,
        };
        if let Some(text) = self.file_cache.read().await.get(id) {
            debug!(target: "studykit_backend", "Material content cache hit");
            return Ok(text.clone());
        }

        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            warn!(target: "studykit_backend", path = %path.display(), error = %e, "Failed to read material");
            GenerationError::MaterialUnreadable { id: id.to_string(), reason: e.to_string() }
        })?;
        self.file_cache.write().await.insert(id.to_string(), text.clone());
        Ok(text)
    }

    /// Register uploaded (already extracted) text. Returns the new entry.
    /// Beyond the upload limit the oldest upload is evicted.
    #[instrument(level = "info", skip(self, text), fields(%title, text_len = text.len()))]
    pub async fn add_uploaded(&self, title: &str, language: Language, text: String) -> Material {
        let id = format!("uploaded-{}", Uuid::new_v4());
        let material = Material {
            id: id.clone(),
            title: title.to_string(),
            kind: "upload".to_string(),
            week: None,
            language,
        };

        let mut catalog = self.catalog.write().await;
        while catalog.uploads.len() >= self.max_uploads {
            let Some(oldest) = catalog.uploads.pop_front() else { break };
            catalog.entries.remove(&oldest);
            warn!(target: "studykit_backend", id = %oldest, "Upload limit reached; evicted oldest upload");
        }
        catalog
            .entries
            .insert(id.clone(), Entry { material: material.clone(), body: Body::Inline(Arc::from(text)) });
        catalog.uploads.push_back(id.clone());
        info!(target: "studykit_backend", %id, "Material uploaded");
        material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_content;

    fn cfg(id: &str, text: Option<&str>, path: Option<PathBuf>) -> MaterialCfg {
        MaterialCfg {
            id: id.to_string(),
            title: format!("Title {id}"),
            kind: None,
            week: None,
            language: Language::En,
            text: text.map(str::to_string),
            path,
        }
    }

    #[tokio::test]
    async fn seed_catalog_spans_several_weeks() {
        let store = MaterialStore::from_config(&[]);
        let list = store.list().await;
        assert_eq!(list.len(), SEED_CATALOG.len());
        for m in &list {
            let text = store.get_source_text(&m.id).await.unwrap();
            assert!(validate_content(&text).is_ok(), "{} is too short", m.id);
            assert_eq!(m.language, Language::De);
        }

        let week2: Vec<String> = store.list_by_week("week2").await.into_iter().map(|m| m.id).collect();
        assert_eq!(week2, vec!["w2-ch3", "w2-ch4"]);
        assert!(store.list_by_week("week9").await.is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MaterialStore::from_config(&[]);
        let err = store.get_source_text("nope").await.unwrap_err();
        assert!(matches!(err, GenerationError::MaterialNotFound(ref id) if id == "nope"));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn file_backed_material_is_read_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week2.txt");
        std::fs::write(&path, "Diffusion in solids").unwrap();
        let store = MaterialStore::from_config(&[cfg("wk-02", None, Some(path.clone()))]);

        assert_eq!(store.get_source_text("wk-02").await.unwrap(), "Diffusion in solids");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(store.get_source_text("wk-02").await.unwrap(), "Diffusion in solids");
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let store = MaterialStore::from_config(&[cfg("gone", None, Some(PathBuf::from("/definitely/not/here.txt")))]);
        let err = store.get_source_text("gone").await.unwrap_err();
        assert!(matches!(err, GenerationError::MaterialUnreadable { .. }));
    }

    #[tokio::test]
    async fn uploads_get_fresh_ids() {
        let store = MaterialStore::from_config(&[cfg("a", Some("inline text"), None)]);
        let m = store.add_uploaded("Notes", Language::De, "Uploaded body".to_string()).await;
        assert!(m.id.starts_with("uploaded-"));
        assert_eq!(store.list().await.len(), 2);
        assert_eq!(store.get_source_text(&m.id).await.unwrap(), "Uploaded body");
        assert_eq!(store.get_material(&m.id).await.unwrap().language, Language::De);
        assert!(store.file_cache.read().await.is_empty());
    }

    #[tokio::test]
    async fn uploads_beyond_the_limit_evict_the_oldest() {
        let store = MaterialStore::from_config(&[cfg("a", Some("inline text"), None)]).with_upload_limit(2);
        let first = store.add_uploaded("One", Language::En, "first".to_string()).await;
        let second = store.add_uploaded("Two", Language::En, "second".to_string()).await;
        let third = store.add_uploaded("Three", Language::En, "third".to_string()).await;

        assert_eq!(store.list().await.len(), 3);
        assert!(matches!(store.get_source_text(&first.id).await, Err(GenerationError::MaterialNotFound(_))));
        assert_eq!(store.get_source_text(&second.id).await.unwrap(), "second");
        assert_eq!(store.get_source_text(&third.id).await.unwrap(), "third");
        assert_eq!(store.get_source_text("a").await.unwrap(), "inline text");
    }
}
