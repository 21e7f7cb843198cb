use criterion::{Criterion, black_box, criterion_group, criterion_main};

use soccer_injuries::model::{RawInjury, RawPlayer};
use soccer_injuries::normalize;

fn bench_dates(c: &mut Criterion) {
    c.bench_function("parse_passport_date", |b| {
        b.iter(|| normalize::parse_passport_date(black_box("24 June 1987")))
    });
    c.bench_function("parse_short_date", |b| {
        b.iter(|| normalize::parse_short_date(black_box("11/03/18")))
    });
}

fn bench_rows(c: &mut Criterion) {
    let raw_player = RawPlayer {
        first_name: Some("Lionel".to_string()),
        last_name: Some("Messi".to_string()),
        nationality: Some("Argentina".to_string()),
        date_of_birth: Some("24 June 1987".to_string()),
        country_of_birth: Some("Argentina".to_string()),
        position: Some("Attacker".to_string()),
        height: Some("170 cm".to_string()),
        weight: Some("72 kg".to_string()),
        foot: Some("Left".to_string()),
        url: Some("/players/lionel-messi/".to_string()),
    };
    c.bench_function("player_row", |b| {
        b.iter(|| normalize::player_row(black_box(0), black_box(&raw_player)))
    });

    let raw_injury = RawInjury {
        player_id: 0,
        description: "Hamstring".to_string(),
        start_date: "11/03/18".to_string(),
        end_date: Some("02/04/18".to_string()),
    };
    c.bench_function("injury_row", |b| {
        b.iter(|| normalize::injury_row(black_box(0), black_box(&raw_injury)))
    });
}

criterion_group!(benches, bench_dates, bench_rows);
criterion_main!(benches);
