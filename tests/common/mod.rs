//! テスト用の共通データとヘルパー関数

#![allow(dead_code)]

use admissions_nlu::NluConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const INTENT_CSV: &str = "\
utterance,intent
học phí bao nhiêu,hoi_hoc_phi
học phí một năm,hoi_hoc_phi
điểm chuẩn ngành,hoi_diem_chuan
điểm chuẩn năm ngoái,hoi_diem_chuan
giới thiệu ngành,hoi_nganh_hoc
ngành học những gì,hoi_nganh_hoc
có học bổng không,hoi_hoc_bong
học bổng khuyến khích,hoi_hoc_bong
xin chào,chao_hoi
";

pub const SYNONYM_CSV: &str = "\
entity,canonical,alias
# majors
TEN_NGANH,công nghệ thông tin,cntt
";

pub const ENTITY_JSON: &str = r#"[
  {"label": "DIEM_CHUAN", "pattern": "điểm chuẩn"},
  {"label": "HOC_PHI", "pattern": "học phí"},
  {"label": "HOC_BONG", "pattern": "học bổng"}
]"#;

pub const MAJORS_CSV: &str = "\
major_code,major_name
7580101,Kiến trúc
7480201,Công nghệ thông tin
7580201,Kỹ thuật xây dựng
";

pub const SCORES_CSV: &str = "\
program_name,subject_combination,2023,2024
Kiến trúc,\"V00, V01\",22.5,23.25
Công nghệ thông tin,\"A00, A01\",24.5,25
";

/// テスト用データディレクトリを作成
pub fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "intent.csv", INTENT_CSV);
    write(dir.path(), "synonym.csv", SYNONYM_CSV);
    write(dir.path(), "entity.json", ENTITY_JSON);
    write(dir.path(), "majors.csv", MAJORS_CSV);
    write(dir.path(), "admission_scores.csv", SCORES_CSV);
    dir
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn config_for(dir: &Path) -> NluConfig {
    NluConfig::default().with_data_dir(dir)
}

/// Sample data shipped with the crate
pub fn shipped_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}
