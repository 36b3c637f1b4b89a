//! Authoring rule tables consumed by the prompt builder.
//!
//! Content is written in Turkish because that is the language the quiz is played in.
//! Tune the wording here; the prompt layout lives in `prompt.rs`.

use crate::domain::{AgeGroup, Category};

pub struct AgeGroupProfile {
  pub label: &'static str,
  pub rules: &'static [&'static str],
}

pub struct CategoryProfile {
  pub label: &'static str,
  pub topic: &'static str,
  pub rules: &'static [&'static str],
}

pub fn age_group_profile(group: AgeGroup) -> AgeGroupProfile {
  match group {
    AgeGroup::Preschool => AgeGroupProfile {
      label: "3-5 yaş (Okul Öncesi)",
      rules: &[
        "Okuma-yazma varsayma; çok kısa ve basit sorular yaz.",
        "Renkler, şekiller, temel kavramlar ve günlük yaşam üzerinden git.",
        "Sayı soruları çok küçük aralıkta olsun (0-10) ve çok basit tut.",
        "Seçenekler tek kelime ya da kısa ifade olsun.",
      ],
    },
    AgeGroup::EarlyPrimary => AgeGroupProfile {
      label: "5-8 yaş (İlkokul Başlangıç)",
      rules: &[
        "Sade Türkçe, 1-2 cümleyi geçmeyen sorular yaz.",
        "Temel toplama/çıkarma, basit okuma-anlama, temel fen kavramları.",
        "Kandırmaca/trick soru yazma; tek doğru cevabı garanti et.",
      ],
    },
    AgeGroup::LatePrimary => AgeGroupProfile {
      label: "8-12 yaş (İlkokul İleri)",
      rules: &[
        "Kısa problem soruları olabilir ama gereksiz uzunluk yapma.",
        "Seçenekler mantıklı çeldiriciler içersin, aşırı bariz olmasın.",
        "Tek doğru cevap kuralına sıkı uy.",
      ],
    },
    AgeGroup::MiddleSchool => AgeGroupProfile {
      label: "12-15 yaş (Ortaokul)",
      rules: &[
        "Biraz daha analitik sorular yaz ama net/ölçülebilir olsun.",
        "Kavram + uygulama karışık sorular olabilir; tek doğru cevabı koru.",
        "Aşırı uzmanlık / tartışmalı cevaplardan kaçın.",
      ],
    },
    AgeGroup::HighSchool => AgeGroupProfile {
      label: "15-18 yaş (Lise)",
      rules: &[
        "Daha zorlayıcı ama kısa ve net sorular yaz.",
        "Çeldiriciler mantıklı olsun; tek doğru cevabı net tut.",
        "Aşırı ezber/tarih-saat gibi gereksiz ayrıntıdan kaçın.",
      ],
    },
    AgeGroup::Adult => AgeGroupProfile {
      label: "18+ (Yetişkin)",
      rules: &[
        "Yetişkin seviyesine uygun genel kültür, mantık ve okuma-anlama soruları yaz.",
        "Hassas içerik, politika, nefret dili gibi alanlardan kaçın.",
        "Tek doğru cevap, net ve ölçülebilir sorular üret.",
      ],
    },
  }
}

pub fn category_profile(category: Category) -> CategoryProfile {
  let topic = category.topic();
  match category {
    Category::Matematik => CategoryProfile {
      label: "Matematik",
      topic,
      rules: &[
        "İşlem soruları kısa olsun; gereksiz metin kullanma.",
        "Seçenekler yakın değerlerde çeldirici içersin (ör: +1, -1, yanlış işlem).",
        "Negatif/ondalık kullanma (G4+ hariç; yine de gerekmedikçe kullanma).",
      ],
    },
    Category::Fen => CategoryProfile {
      label: "Fen Bilimleri",
      topic,
      rules: &[
        "Günlük hayattan gözlemlenebilir fen örnekleri kullan.",
        "Tartışmalı/yorum soruları yazma; tek doğru cevabı olan soru üret.",
        "Deney güvenliği, doğa olayları, canlılar gibi temel konular.",
      ],
    },
    Category::Turkce => CategoryProfile {
      label: "Türkçe",
      topic,
      rules: &[
        "Sadece DİL BİLGİSİ odaklı soru yaz: anlam, yorum, ana fikir, çıkarım gibi okuma-anlama isteme.",
        "Kapsam (yaşa uygun seç): sözcük türleri, ekler, kök-ek, zaman-kip, kişi ekleri, yazım-noktalama (temel).",
        "Soru kökü net ve kısa olsun; tek bir kazanımı ölçsün. Gereksiz hikâye/metin ekleme.",
        "Şıklarda biçim tutarlılığı zorunlu: hepsi tek kelime/hepsi ekli biçim/hepsi kısa ifade.",
        "Çeldiriciler en sık yapılan hatalara dayansın; rastgele/absürt seçenek yazma.",
        "Tek doğru cevap üret; doğru cevap dil bilgisi kuralıyla doğrulanabilir olsun.",
      ],
    },
    Category::Tarih => CategoryProfile {
      label: "Tarih",
      topic,
      rules: &[
        "Tartışmalı, yoruma açık sorulardan kaçın.",
        "Temel kavramlar, önemli olaylar/kişiler (yaşa uygun).",
        "İmkansız ayrıntı (tarih/ay/gün) sorma.",
      ],
    },
    Category::Cografya => CategoryProfile {
      label: "Coğrafya",
      topic,
      rules: &[
        "Harita gerektirmeyen, temel coğrafya bilgisi sor.",
        "Yer şekilleri, iklim, temel kavramlar (deniz/dağ/ova).",
        "Çok spesifik detaylardan kaçın (küçük ilçe/dağ adı vb.).",
      ],
    },
    Category::GenelKultur => CategoryProfile {
      label: "Genel Kültür",
      topic,
      rules: &[
        "Günlük hayat, temel bilgiler, çocukların bildiği kavramlar.",
        "Tek doğru cevabı olan, net sorular üret.",
        "Aşırı \"yetişkin\" bilgi (politika, hassas konular) sorma.",
      ],
    },
  }
}
