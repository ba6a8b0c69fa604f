#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![deny(warnings)]

//! Desktop shell. The web front end drives everything through the
//! commands registered in `main`; state lives in tauri's managed state.

use planner_calc::BatchResult;
use planner_core::{CharacterInfo, PlanRequest, WeaponInfo};
use planner_data::{
    ConfiguredSource, DataCache, HttpTransport, ImageCache, ImageCacheStats, PlannerConfig,
    Transport, UpstreamSource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tauri::{Manager, State};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Planner<S, T> {
    data: DataCache<S>,
    images: Arc<ImageCache<T>>,
}

type AppState = Planner<ConfiguredSource<HttpTransport>, HttpTransport>;

/// List entry with its icon already resolved to a URL.
#[derive(Serialize, Debug, Clone)]
struct Listed<T> {
    #[serde(flatten)]
    info: T,
    icon_url: String,
}

impl<S: UpstreamSource, T: Transport> Planner<S, T> {
    async fn characters(&self) -> Result<Vec<Listed<CharacterInfo>>, String> {
        let list = self.data.characters().await.map_err(|e| e.to_string())?;
        Ok(list
            .iter()
            .map(|c| Listed {
                icon_url: self.data.icon_url(&c.icon),
                info: c.clone(),
            })
            .collect())
    }

    async fn weapons(&self) -> Result<Vec<Listed<WeaponInfo>>, String> {
        let list = self.data.weapons().await.map_err(|e| e.to_string())?;
        Ok(list
            .iter()
            .map(|w| Listed {
                icon_url: self.data.icon_url(&w.icon),
                info: w.clone(),
            })
            .collect())
    }

    async fn calculate(&self, requests: &[PlanRequest]) -> Result<BatchResult, String> {
        self.data
            .plan_batch(requests)
            .await
            .map_err(|e| e.to_string())
    }

    async fn image(&self, url: &str) -> Option<String> {
        let path = self.images.get(url).await?;
        Some(path.to_string_lossy().into_owned())
    }
}

#[tauri::command]
async fn list_characters(state: State<'_, AppState>) -> Result<Vec<Listed<CharacterInfo>>, String> {
    state.characters().await
}

#[tauri::command]
async fn list_weapons(state: State<'_, AppState>) -> Result<Vec<Listed<WeaponInfo>>, String> {
    state.weapons().await
}

#[tauri::command]
async fn calculate_materials(
    state: State<'_, AppState>,
    requests: Vec<PlanRequest>,
) -> Result<BatchResult, String> {
    state.calculate(&requests).await
}

#[tauri::command]
fn clear_data_cache(state: State<'_, AppState>) {
    state.data.clear();
}

/// Local file path of a remote icon; `None` when it cannot be fetched.
#[tauri::command]
async fn cached_image(state: State<'_, AppState>, url: String) -> Result<Option<String>, String> {
    Ok(state.image(&url).await)
}

#[tauri::command]
async fn preload_images(state: State<'_, AppState>, urls: Vec<String>) -> Result<usize, String> {
    Ok(Arc::clone(&state.images).preload(urls).await)
}

#[tauri::command]
async fn clear_image_cache(state: State<'_, AppState>) -> Result<(), String> {
    state.images.clear().await.map_err(|e| e.to_string())
}

#[tauri::command]
fn image_cache_stats(state: State<'_, AppState>) -> ImageCacheStats {
    state.images.stats()
}

#[tauri::command]
fn app_version() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"))
}

/// `planner.yaml` in the app config dir when present, defaults otherwise.
fn load_config(config_dir: Option<&Path>) -> PlannerConfig {
    let path = config_dir.map(|d| d.join("planner.yaml"));
    let mut config = match path.filter(|p| p.exists()) {
        Some(path) => PlannerConfig::load(&path).unwrap_or_else(|error| {
            warn!(%error, path = %path.display(), "ignoring unreadable configuration");
            PlannerConfig::default()
        }),
        None => PlannerConfig::default(),
    };
    if let Err(error) = config.apply_env() {
        warn!(%error, "ignoring base url override");
        config.base_url = PlannerConfig::default().base_url;
    }
    config
}

fn image_dir(config: &PlannerConfig, cache_dir: Option<PathBuf>) -> PathBuf {
    config
        .image_cache_dir
        .clone()
        .or_else(|| cache_dir.map(|d| d.join("image_cache")))
        .unwrap_or_else(|| std::env::temp_dir().join("material-planner").join("image_cache"))
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tauri::Builder::default()
        .setup(|app| {
            let config = load_config(app.path().app_config_dir().ok().as_deref());
            let images = image_dir(&config, app.path().app_cache_dir().ok());
            info!(source = ?config.source, images = %images.display(), "planner ready");
            app.manage(AppState {
                data: DataCache::new(config.build_source()),
                images: Arc::new(ImageCache::new(images, config.transport())),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            list_characters,
            list_weapons,
            calculate_materials,
            clear_data_cache,
            cached_image,
            preload_images,
            clear_image_cache,
            image_cache_stats,
            app_version
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_core::{
        Catalog, CharacterMaterialProfile, Element, MaterialRequirement, PlanTargets, WeaponType,
    };
    use planner_data::DataError;
    use std::future::Future;

    struct FakeSource;

    impl UpstreamSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog, DataError>> + Send {
            async { Ok(Catalog::new(Vec::new())) }
        }

        fn fetch_characters(
            &self,
        ) -> impl Future<Output = Result<Vec<CharacterInfo>, DataError>> + Send {
            async {
                Ok(vec![CharacterInfo {
                    id: 10000002,
                    key: "Ayaka".into(),
                    display_name: "Kamisato Ayaka".into(),
                    icon: "UI_AvatarIcon_Ayaka".into(),
                    rarity: 5,
                    weapon: WeaponType::Sword,
                    element: Element::Cryo,
                    release: None,
                }])
            }
        }

        fn fetch_weapons(&self) -> impl Future<Output = Result<Vec<WeaponInfo>, DataError>> + Send {
            async { Ok(Vec::new()) }
        }

        fn fetch_profile(
            &self,
            character_id: &str,
        ) -> impl Future<Output = Result<CharacterMaterialProfile, DataError>> + Send {
            let character_id = character_id.to_string();
            async move {
                Ok(CharacterMaterialProfile {
                    character_id,
                    ascension: vec![MaterialRequirement::new(); 7],
                    talents: std::array::from_fn(|_| vec![MaterialRequirement::new(); 9]),
                    level_exp: Some(vec![1_000; 89]),
                })
            }
        }

        fn icon_url(&self, icon: &str) -> String {
            format!("https://img.example/{icon}.webp")
        }
    }

    struct NoNetwork;

    impl Transport for NoNetwork {
        fn get_text(&self, url: &str) -> impl Future<Output = Result<String, DataError>> + Send {
            let url = url.to_string();
            async move {
                Err(DataError::Transport {
                    url,
                    message: "offline".into(),
                })
            }
        }

        fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
            let url = url.to_string();
            async move {
                Err(DataError::Transport {
                    url,
                    message: "offline".into(),
                })
            }
        }
    }

    fn planner() -> Planner<FakeSource, NoNetwork> {
        Planner {
            data: DataCache::new(FakeSource),
            images: Arc::new(ImageCache::new(std::env::temp_dir().join("planner-ui-test"), NoNetwork)),
        }
    }

    #[test]
    fn characters_carry_icon_urls() {
        let rt = tauri::async_runtime::TokioRuntime::new().expect("rt");
        let list = rt.block_on(planner().characters()).expect("list");
        assert_eq!(list[0].icon_url, "https://img.example/UI_AvatarIcon_Ayaka.webp");
        let json = serde_json::to_value(&list[0]).expect("json");
        assert_eq!(json["display_name"], "Kamisato Ayaka");
    }

    #[test]
    fn calculation_errors_become_strings() {
        let rt = tauri::async_runtime::TokioRuntime::new().expect("rt");
        let planner = planner();
        let ok = rt.block_on(planner.calculate(&[PlanRequest {
            character_id: "10000002".into(),
            targets: PlanTargets {
                level_from: 1,
                level_to: 20,
                ..PlanTargets::default()
            },
        }]));
        let result = ok.expect("batch");
        assert_eq!(result.per_character[0].name, "Kamisato Ayaka");
        assert_eq!(result.combined.len(), 2);

        let err = rt
            .block_on(planner.calculate(&[PlanRequest {
                character_id: "10000002".into(),
                targets: PlanTargets {
                    level_from: 0,
                    ..PlanTargets::default()
                },
            }]))
            .unwrap_err();
        assert!(err.contains("10000002"));
    }

    #[test]
    fn unreachable_images_resolve_to_none() {
        let rt = tauri::async_runtime::TokioRuntime::new().expect("rt");
        let planner = planner();
        assert_eq!(rt.block_on(planner.image("https://img.example/missing.webp")), None);
        assert_eq!(planner.images.stats(), ImageCacheStats::default());
    }

    #[test]
    fn image_dir_prefers_configuration() {
        let mut config = PlannerConfig::default();
        assert_eq!(
            image_dir(&config, Some(PathBuf::from("/cache"))),
            PathBuf::from("/cache/image_cache")
        );
        config.image_cache_dir = Some(PathBuf::from("/icons"));
        assert_eq!(image_dir(&config, Some(PathBuf::from("/cache"))), PathBuf::from("/icons"));
    }
}
