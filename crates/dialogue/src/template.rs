//! Deterministic vernacular fallbacks. Every tactic renders in every
//! supported language with the clamped price as the only number in the text.

use mol_bhav_types::{Language, Tactic};

/// Indian digit grouping with the rupee sign: 1234567 -> ₹12,34,567
pub fn format_rupees(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{digits}");
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut grouped = String::new();
    let head_bytes = head.as_bytes();
    for (i, b) in head_bytes.iter().enumerate() {
        if i > 0 && (head_bytes.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(*b as char);
    }
    format!("₹{grouped},{tail}")
}

/// Render the deterministic message for a tactic. Used directly when no LLM
/// is configured and as the fallback when generation misbehaves.
pub fn render_template(tactic: Tactic, price: u64, language: Language) -> String {
    let p = format_rupees(price);
    match (language, tactic) {
        // ==== English ====
        (Language::En, Tactic::OpeningAnchor) => {
            format!("Welcome! For this piece the price is {p}. Pure quality, you will not regret it.")
        }
        (Language::En, Tactic::Accept) => format!("Done, pakka! {p} it is. You bargain well, ji."),
        (Language::En, Tactic::Concession) => {
            format!("Arre, you are tough! Okay, {p} — that is a good-faith price.")
        }
        (Language::En, Tactic::AnchorDefense) => {
            format!("At {p} this is already honest value. Lower than that I cannot go.")
        }
        (Language::En, Tactic::QuantityPivot) => {
            format!("The price stays {p}, but take two pieces and I will sweeten the deal.")
        }
        (Language::En, Tactic::WalkAwaySave) => {
            format!("Wait, wait! Do not go — {p}, final. Only for you.")
        }
        (Language::En, Tactic::BotBlock) => {
            format!("This bargaining does not look human to me. The counter stays at {p}.")
        }
        (Language::En, Tactic::Deadline) => {
            format!("We have haggled enough, friend. {p} was my last word.")
        }
        (Language::En, Tactic::Timeout) => {
            format!("You went quiet and the session lapsed. Come again, we start fresh at {p}.")
        }

        // ==== Hindi ====
        (Language::Hi, Tactic::OpeningAnchor) => {
            format!("आइए साहब! इस माल का दाम {p} है। एकदम बढ़िया क्वालिटी।")
        }
        (Language::Hi, Tactic::Accept) => format!("पक्का सौदा! {p} में आपका हुआ। खूब मोल-भाव किया आपने।"),
        (Language::Hi, Tactic::Concession) => format!("अरे भाई, आप तो कमाल हैं! चलिए {p} लगा दिया।"),
        (Language::Hi, Tactic::AnchorDefense) => format!("{p} में ही पूरी ईमानदारी का दाम है, इससे नीचे नहीं होगा।"),
        (Language::Hi, Tactic::QuantityPivot) => format!("दाम {p} ही रहेगा, पर दो लीजिए तो कुछ और जोड़ दूँगा।"),
        (Language::Hi, Tactic::WalkAwaySave) => format!("अरे रुकिए! जाइए मत — {p} फाइनल, सिर्फ आपके लिए।"),
        (Language::Hi, Tactic::BotBlock) => format!("यह मोल-भाव इंसानी नहीं लगता। भाव {p} पर ही रहेगा।"),
        (Language::Hi, Tactic::Deadline) => format!("बहुत हो गया भाई, {p} मेरी आखिरी बात थी।"),
        (Language::Hi, Tactic::Timeout) => format!("आप चुप हो गए और सौदा ठंडा पड़ गया। फिर आइए, {p} से शुरू करेंगे।"),

        // ==== Tamil ====
        (Language::Ta, Tactic::OpeningAnchor) => format!("வாங்க! இந்த பொருளுக்கு விலை {p}. தரம் உத்தரவாதம்.") ,
        (Language::Ta, Tactic::Accept) => format!("சரி, முடிந்தது! {p}-க்கு உங்களுடையது."),
        (Language::Ta, Tactic::Concession) => format!("சரி சரி, {p} — இது நியாயமான விலை."),
        (Language::Ta, Tactic::AnchorDefense) => format!("{p}-யே நேர்மையான விலை, இதற்கு கீழே முடியாது."),
        (Language::Ta, Tactic::QuantityPivot) => format!("விலை {p} தான், இரண்டு எடுத்தால் கொஞ்சம் சேர்த்து தருகிறேன்."),
        (Language::Ta, Tactic::WalkAwaySave) => format!("போகாதீங்க! {p} — கடைசி விலை, உங்களுக்காக மட்டும்."),
        (Language::Ta, Tactic::BotBlock) => format!("இந்த பேரம் இயந்திரம் போல் தெரிகிறது. விலை {p}-யில் நிற்கும்."),
        (Language::Ta, Tactic::Deadline) => format!("போதும் நண்பா, {p} என் கடைசி வார்த்தை."),
        (Language::Ta, Tactic::Timeout) => format!("நீங்கள் பேசாமல் போனதால் அமர்வு முடிந்தது. மீண்டும் {p}-இல் தொடங்குவோம்."),

        // ==== Telugu ====
        (Language::Te, Tactic::OpeningAnchor) => format!("రండి! ఈ వస్తువు ధర {p}. నాణ్యత గ్యారంటీ."),
        (Language::Te, Tactic::Accept) => format!("సరే, ఒప్పందం! {p}-కి మీదే."),
        (Language::Te, Tactic::Concession) => format!("సరే బాబు, {p} — ఇది మంచి ధర."),
        (Language::Te, Tactic::AnchorDefense) => format!("{p} అనేది నిజాయితీ ధర, ఇంతకన్నా తగ్గదు."),
        (Language::Te, Tactic::QuantityPivot) => format!("ధర {p} అలాగే ఉంటుంది, రెండు తీసుకుంటే కొంచెం కలుపుతాను."),
        (Language::Te, Tactic::WalkAwaySave) => format!("ఆగండి! వెళ్లకండి — {p} ఫైనల్, మీ కోసమే."),
        (Language::Te, Tactic::BotBlock) => format!("ఈ బేరం మనిషిలా లేదు. ధర {p} దగ్గరే ఉంటుంది."),
        (Language::Te, Tactic::Deadline) => format!("చాలు మిత్రమా, {p} నా చివరి మాట."),
        (Language::Te, Tactic::Timeout) => format!("మీరు మౌనంగా ఉండటంతో సెషన్ ముగిసింది. మళ్లీ {p} నుంచి మొదలుపెడదాం."),

        // ==== Marathi ====
        (Language::Mr, Tactic::OpeningAnchor) => format!("या साहेब! या मालाची किंमत {p} आहे. उत्तम दर्जा.") ,
        (Language::Mr, Tactic::Accept) => format!("ठरलं! {p} मध्ये तुमचं झालं."),
        (Language::Mr, Tactic::Concession) => format!("अहो, तुम्ही पक्के आहात! चला {p} लावली."),
        (Language::Mr, Tactic::AnchorDefense) => format!("{p} हीच प्रामाणिक किंमत आहे, याखाली जमणार नाही."),
        (Language::Mr, Tactic::QuantityPivot) => format!("किंमत {p} च राहील, पण दोन घेतलीत तर काही जोडून देईन."),
        (Language::Mr, Tactic::WalkAwaySave) => format!("थांबा! जाऊ नका — {p} फायनल, फक्त तुमच्यासाठी."),
        (Language::Mr, Tactic::BotBlock) => format!("ही घासाघीस माणसासारखी वाटत नाही. भाव {p} वरच राहील."),
        (Language::Mr, Tactic::Deadline) => format!("झालं आता मित्रा, {p} हा माझा शेवटचा शब्द."),
        (Language::Mr, Tactic::Timeout) => format!("तुम्ही गप्प झालात आणि सत्र संपलं. पुन्हा या, {p} पासून सुरू करू."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indian_digit_grouping() {
        assert_eq!(format_rupees(999), "₹999");
        assert_eq!(format_rupees(1_000), "₹1,000");
        assert_eq!(format_rupees(12_999), "₹12,999");
        assert_eq!(format_rupees(123_456), "₹1,23,456");
        assert_eq!(format_rupees(1_234_567), "₹12,34,567");
        assert_eq!(format_rupees(123_456_789), "₹12,34,56,789");
    }

    #[test]
    fn test_every_tactic_renders_in_every_language() {
        let tactics = [
            Tactic::OpeningAnchor,
            Tactic::Accept,
            Tactic::Concession,
            Tactic::AnchorDefense,
            Tactic::QuantityPivot,
            Tactic::WalkAwaySave,
            Tactic::BotBlock,
            Tactic::Deadline,
            Tactic::Timeout,
        ];
        let languages = [Language::En, Language::Hi, Language::Ta, Language::Te, Language::Mr];
        for language in languages {
            for tactic in tactics {
                let message = render_template(tactic, 12_999, language);
                assert!(message.contains("₹12,999"), "{language} {tactic}: {message}");
            }
        }
    }

    #[test]
    fn test_template_contains_only_the_quoted_price() {
        let message = render_template(Tactic::Concession, 11_500, Language::En);
        let digits: String = message.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits, "11500");
    }
}
